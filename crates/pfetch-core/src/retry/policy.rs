use super::classify::{classify_exit, ExitClass, DEFAULT_RETRY_THRESHOLD};

/// Per-run retry policy: how often a job may be retried and which exit
/// codes count as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed per job after the first attempt.
    pub budget: u32,
    /// Lowest exit code treated as transient.
    pub threshold: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: 100,
            threshold: DEFAULT_RETRY_THRESHOLD,
        }
    }
}

impl RetryPolicy {
    pub fn classify(&self, exit_code: Option<i32>) -> ExitClass {
        classify_exit(exit_code, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.budget, 100);
        assert_eq!(p.classify(Some(19)), ExitClass::Permanent);
        assert_eq!(p.classify(Some(20)), ExitClass::Transient);
    }

    #[test]
    fn remapped_threshold() {
        let p = RetryPolicy {
            budget: 1,
            threshold: 100,
        };
        assert_eq!(p.classify(Some(23)), ExitClass::Permanent);
        assert_eq!(p.classify(Some(100)), ExitClass::Transient);
    }
}
