//! Classify transfer exit codes into success, permanent and transient failures.

use crate::job::JobStatus;

/// rsync exit codes below 20 are usage, protocol, selection and I/O errors
/// (1-14); 20 and above are signals, partial transfers and timeouts (20-35).
pub const DEFAULT_RETRY_THRESHOLD: i32 = 20;

/// High-level outcome of one transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    /// Exit code 0.
    Success,
    /// Not worth retrying: the same command would fail the same way.
    Permanent,
    /// Network-ish condition; the job goes to `broken` and may be retried.
    Transient,
}

impl ExitClass {
    /// Job status an attempt with this outcome ends in.
    pub fn job_status(self) -> JobStatus {
        match self {
            ExitClass::Success => JobStatus::Completed,
            ExitClass::Permanent => JobStatus::Failed,
            ExitClass::Transient => JobStatus::Broken,
        }
    }
}

/// Classify an exit code against `threshold`. A missing code (killed by a
/// signal) is permanent.
pub fn classify_exit(exit_code: Option<i32>, threshold: i32) -> ExitClass {
    match exit_code {
        Some(0) => ExitClass::Success,
        Some(code) if code >= threshold => ExitClass::Transient,
        Some(_) | None => ExitClass::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_success() {
        assert_eq!(classify_exit(Some(0), DEFAULT_RETRY_THRESHOLD), ExitClass::Success);
        assert_eq!(ExitClass::Success.job_status(), JobStatus::Completed);
    }

    #[test]
    fn threshold_boundary() {
        assert_eq!(classify_exit(Some(19), 20), ExitClass::Permanent);
        assert_eq!(classify_exit(Some(20), 20), ExitClass::Transient);
        assert_eq!(ExitClass::Permanent.job_status(), JobStatus::Failed);
        assert_eq!(ExitClass::Transient.job_status(), JobStatus::Broken);
    }

    #[test]
    fn rsync_codes() {
        for code in [1, 2, 3, 5, 10, 11, 12, 13, 14] {
            assert_eq!(classify_exit(Some(code), 20), ExitClass::Permanent, "code {code}");
        }
        for code in [20, 23, 24, 30, 35] {
            assert_eq!(classify_exit(Some(code), 20), ExitClass::Transient, "code {code}");
        }
    }

    #[test]
    fn signal_and_negative_are_permanent() {
        assert_eq!(classify_exit(None, 20), ExitClass::Permanent);
        assert_eq!(classify_exit(Some(-1), 20), ExitClass::Permanent);
    }
}
