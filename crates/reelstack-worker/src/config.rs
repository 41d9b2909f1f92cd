//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root directory under which per-job workspaces are created
    pub work_dir: PathBuf,
    /// Kill an encoder process that runs longer than this
    pub ffmpeg_timeout: Option<Duration>,
    /// TCP connect timeout for asset downloads
    pub fetch_connect_timeout: Duration,
    /// Probe the finished output and check its geometry and duration
    pub verify_output: bool,
    /// Delete a job's workspace when the job fails
    pub remove_failed_workspaces: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/reelstack"),
            ffmpeg_timeout: None,
            fetch_connect_timeout: Duration::from_secs(30),
            verify_output: false,
            remove_failed_workspaces: false,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_timeout: std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
            fetch_connect_timeout: Duration::from_secs(
                std::env::var("FETCH_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            verify_output: env_flag("VERIFY_OUTPUT").unwrap_or(defaults.verify_output),
            remove_failed_workspaces: env_flag("REMOVE_FAILED_WORKSPACES")
                .unwrap_or(defaults.remove_failed_workspaces),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("/tmp/reelstack"));
        assert!(config.ffmpeg_timeout.is_none());
        assert_eq!(config.fetch_connect_timeout, Duration::from_secs(30));
        assert!(!config.verify_output);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
