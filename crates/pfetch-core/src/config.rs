use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::job::DEFAULT_SINGLE_FILE_EXTENSIONS;
use crate::retry::{RetryPolicy, DEFAULT_RETRY_THRESHOLD};

/// Global configuration loaded from `~/.config/pfetch/config.toml`.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of concurrent workers (transfers in flight).
    pub concurrency: usize,
    /// How many times a transiently failing job is retried before it is marked failed.
    pub retry_budget: u32,
    /// Transfer program invoked as `<program> [<opts>] <source> <dest>`.
    pub transfer_program: String,
    /// Exit codes at or above this value are transient (retried); lower nonzero codes are permanent.
    /// 20 matches rsync's documented ranges; remap it when using another transfer tool.
    pub retry_threshold: i32,
    /// Progress display refresh interval in milliseconds.
    pub progress_interval_ms: u64,
    /// Dispatcher rescan interval in milliseconds (it is also woken by workers).
    pub dispatch_interval_ms: u64,
    /// Output lines kept per worker for the progress display.
    pub recent_output_lines: usize,
    /// Manifest entries with these extensions are fetched as single files, not directories.
    pub single_file_extensions: Vec<String>,
    /// Directory for per-job and per-worker log files (None = current directory).
    pub log_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry_budget: 100,
            transfer_program: "rsync".to_string(),
            retry_threshold: DEFAULT_RETRY_THRESHOLD,
            progress_interval_ms: 2000,
            dispatch_interval_ms: 100,
            recent_output_lines: 5,
            single_file_extensions: DEFAULT_SINGLE_FILE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_dir: None,
        }
    }
}

impl FetchConfig {
    /// Reject values the run controller cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.transfer_program.trim().is_empty() {
            anyhow::bail!("transfer_program must not be empty");
        }
        if self.retry_threshold <= 0 {
            anyhow::bail!(
                "retry_threshold must be positive (got {})",
                self.retry_threshold
            );
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            budget: self.retry_budget,
            threshold: self.retry_threshold,
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms.max(1))
    }

    /// Directory that receives job and worker logs.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.retry_budget, 100);
        assert_eq!(cfg.transfer_program, "rsync");
        assert_eq!(cfg.retry_threshold, 20);
        assert_eq!(cfg.progress_interval_ms, 2000);
        assert_eq!(cfg.recent_output_lines, 5);
        assert!(cfg.single_file_extensions.iter().any(|e| e == "fits"));
        assert!(cfg.log_dir.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: FetchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_file_keeps_defaults() {
        let toml = r#"
            concurrency = 8
            retry_budget = 3
            log_dir = "/var/log/pfetch"
        "#;
        let cfg: FetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.retry_budget, 3);
        assert_eq!(cfg.log_dir, Some(PathBuf::from("/var/log/pfetch")));
        assert_eq!(cfg.transfer_program, "rsync");
        assert_eq!(cfg.retry_threshold, 20);
        assert_eq!(cfg.dispatch_interval_ms, 100);
    }

    #[test]
    fn config_toml_custom_transfer_tool() {
        let toml = r#"
            transfer_program = "/usr/local/bin/mirror"
            retry_threshold = 64
            single_file_extensions = ["iso", "img"]
        "#;
        let cfg: FetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.transfer_program, "/usr/local/bin/mirror");
        let policy = cfg.retry_policy();
        assert_eq!(policy.threshold, 64);
        assert_eq!(policy.budget, 100);
        assert_eq!(cfg.single_file_extensions, vec!["iso", "img"]);
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let cfg = FetchConfig {
            concurrency: 0,
            ..FetchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn log_dir_defaults_to_current_directory() {
        assert_eq!(FetchConfig::default().log_dir(), PathBuf::from("."));
    }
}
