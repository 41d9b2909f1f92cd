//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while staging assets or running the encoder.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}{}", exit_suffix(*exit_code))]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Concatenation failed, clips are likely not stream-compatible{}", exit_suffix(*exit_code))]
    ConcatMismatch {
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Filter graph rejected: {0}")]
    GraphBuild(String),

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Fetching {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Fetching {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Asset is empty: {0}")]
    EmptyAsset(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Workspace already exists: {0}")]
    WorkspaceExists(PathBuf),

    #[error("Invalid job ID for workspace: {0}")]
    InvalidJobId(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a transport-level fetch error.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a filter graph construction error.
    pub fn graph_build(message: impl Into<String>) -> Self {
        Self::GraphBuild(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Remote asset unreachable or rejected.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, MediaError::HttpStatus { .. } | MediaError::Transport { .. })
    }

    /// The external encoder (or graph construction for it) failed.
    pub fn is_encode_error(&self) -> bool {
        matches!(
            self,
            MediaError::FfmpegFailed { .. }
                | MediaError::ConcatMismatch { .. }
                | MediaError::GraphBuild(_)
                | MediaError::FfmpegNotFound
        )
    }

    /// Encoder diagnostics captured from stderr, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed { stderr, .. }
            | MediaError::ConcatMismatch { stderr, .. }
            | MediaError::FfprobeFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }

    /// Exit code of the failed encoder process, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            MediaError::FfmpegFailed { exit_code, .. }
            | MediaError::ConcatMismatch { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn exit_suffix(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let http = MediaError::HttpStatus {
            url: "https://x.test/a.mp4".to_string(),
            status: 404,
        };
        assert!(http.is_fetch_error());
        assert!(!http.is_encode_error());

        let concat = MediaError::ConcatMismatch {
            stderr: Some("Non-monotonous DTS".to_string()),
            exit_code: Some(1),
        };
        assert!(concat.is_encode_error());
        assert_eq!(concat.diagnostics(), Some("Non-monotonous DTS"));
        assert_eq!(concat.exit_code(), Some(1));

        assert!(!MediaError::Cancelled.is_fetch_error());
        assert!(!MediaError::Cancelled.is_encode_error());
    }

    #[test]
    fn test_exit_code_display() {
        let concat = MediaError::ConcatMismatch {
            stderr: None,
            exit_code: Some(1),
        };
        assert_eq!(
            concat.to_string(),
            "Concatenation failed, clips are likely not stream-compatible (exit code 1)"
        );

        let killed = MediaError::ffmpeg_failed("FFmpeg exited with non-zero status", None, None);
        assert_eq!(killed.to_string(), "FFmpeg command failed: FFmpeg exited with non-zero status");
    }
}
