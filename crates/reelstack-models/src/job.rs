//! Composition job definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Output duration used when a request does not specify one.
pub const DEFAULT_TARGET_DURATION_SECS: u32 = 60;

/// URL schemes the fetcher knows how to stage.
const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "file"];

/// Unique identifier for a composition job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors in a job description, detected before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("primary source URL is required")]
    MissingPrimaryUrl,

    #[error("at least one bottom clip URL is required")]
    EmptyBottomClipList,

    #[error("target duration must be a positive number of seconds, got {0}")]
    InvalidDuration(i64),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("geometry mismatch: {0}")]
    GeometryMismatch(String),
}

impl ValidationError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Pipeline state of a composition job.
///
/// Jobs move linearly `Created -> AssetsFetched -> BottomConcatenated ->
/// Composed -> Done`. A failure is reported against the stage the job was
/// trying to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    #[default]
    Created,
    AssetsFetched,
    BottomConcatenated,
    Composed,
    Done,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Created => "created",
            JobStage::AssetsFetched => "assets_fetched",
            JobStage::BottomConcatenated => "bottom_concatenated",
            JobStage::Composed => "composed",
            JobStage::Done => "done",
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<JobStage> {
        match self {
            JobStage::Created => Some(JobStage::AssetsFetched),
            JobStage::AssetsFetched => Some(JobStage::BottomConcatenated),
            JobStage::BottomConcatenated => Some(JobStage::Composed),
            JobStage::Composed => Some(JobStage::Done),
            JobStage::Done => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Done)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming job description as received over HTTP or from a job file.
///
/// Field aliases accept the payload shape of the earlier Flask service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompositionRequest {
    /// Top-region video URL
    #[serde(default, alias = "youtube_url")]
    pub primary_url: Option<String>,

    /// Bottom-region clip URLs in playback order
    #[serde(default, alias = "satisfying_urls")]
    pub bottom_urls: Vec<String>,

    /// Target duration in seconds
    #[serde(default)]
    pub duration: Option<i64>,
}

impl CompositionRequest {
    /// Validate the request and turn it into a job with a fresh ID.
    pub fn into_job(self) -> Result<CompositionJob, ValidationError> {
        let primary = self
            .primary_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(ValidationError::MissingPrimaryUrl)?;

        if self.bottom_urls.is_empty() {
            return Err(ValidationError::EmptyBottomClipList);
        }

        let duration = match self.duration {
            None => DEFAULT_TARGET_DURATION_SECS,
            Some(d) if d > 0 && d <= u32::MAX as i64 => d as u32,
            Some(d) => return Err(ValidationError::InvalidDuration(d)),
        };

        let job = CompositionJob::new(primary, self.bottom_urls, duration);
        job.validate()?;
        Ok(job)
    }
}

/// The unit of work: one primary video, one or more bottom clips, one output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompositionJob {
    /// Unique job ID, prefix of each run's workspace directory
    pub id: JobId,

    /// Top-region video URL
    pub primary_source_url: String,

    /// Bottom-region clip URLs in playback order
    pub bottom_clip_urls: Vec<String>,

    /// Output duration in seconds
    #[serde(default = "default_target_duration")]
    pub target_duration_seconds: u32,
}

fn default_target_duration() -> u32 {
    DEFAULT_TARGET_DURATION_SECS
}

impl CompositionJob {
    /// Create a job with a freshly generated ID.
    pub fn new(
        primary_source_url: impl Into<String>,
        bottom_clip_urls: Vec<String>,
        target_duration_seconds: u32,
    ) -> Self {
        Self {
            id: JobId::new(),
            primary_source_url: primary_source_url.into(),
            bottom_clip_urls,
            target_duration_seconds,
        }
    }

    /// Check the job description without touching the network or disk.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.primary_source_url.trim().is_empty() {
            return Err(ValidationError::MissingPrimaryUrl);
        }
        if self.bottom_clip_urls.is_empty() {
            return Err(ValidationError::EmptyBottomClipList);
        }
        if self.target_duration_seconds == 0 {
            return Err(ValidationError::InvalidDuration(0));
        }

        validate_source_url(&self.primary_source_url)?;
        for url in &self.bottom_clip_urls {
            validate_source_url(url)?;
        }
        Ok(())
    }

    /// Number of bottom clips.
    pub fn bottom_clip_count(&self) -> usize {
        self.bottom_clip_urls.len()
    }
}

/// Check that a URL parses and uses a scheme the fetcher supports.
pub fn validate_source_url(raw: &str) -> Result<Url, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::invalid_url(raw, "URL cannot be empty"));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| ValidationError::invalid_url(raw, format!("invalid URL format: {}", e)))?;

    if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(ValidationError::invalid_url(
            raw,
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(primary: Option<&str>, bottoms: &[&str], duration: Option<i64>) -> CompositionRequest {
        CompositionRequest {
            primary_url: primary.map(str::to_string),
            bottom_urls: bottoms.iter().map(|s| s.to_string()).collect(),
            duration,
        }
    }

    #[test]
    fn test_request_into_job_defaults_duration() {
        let job = request(Some("https://cdn.example.com/a.mp4"), &["https://cdn.example.com/b.mp4"], None)
            .into_job()
            .unwrap();

        assert_eq!(job.target_duration_seconds, DEFAULT_TARGET_DURATION_SECS);
        assert_eq!(job.bottom_clip_count(), 1);
        assert!(!job.id.as_str().is_empty());
    }

    #[test]
    fn test_missing_primary_checked_first() {
        let err = request(None, &[], Some(-1)).into_job().unwrap_err();
        assert_eq!(err, ValidationError::MissingPrimaryUrl);

        let err = request(Some("   "), &["https://x.test/b.mp4"], None)
            .into_job()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingPrimaryUrl);
    }

    #[test]
    fn test_empty_bottom_list_rejected() {
        let err = request(Some("https://x.test/a.mp4"), &[], None)
            .into_job()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyBottomClipList);
    }

    #[test]
    fn test_invalid_duration_rejected() {
        for d in [0, -5] {
            let err = request(Some("https://x.test/a.mp4"), &["https://x.test/b.mp4"], Some(d))
                .into_job()
                .unwrap_err();
            assert_eq!(err, ValidationError::InvalidDuration(d));
        }
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let err = request(Some("ftp://x.test/a.mp4"), &["https://x.test/b.mp4"], None)
            .into_job()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUrl { .. }));

        let err = request(Some("https://x.test/a.mp4"), &["not a url"], None)
            .into_job()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUrl { .. }));
    }

    #[test]
    fn test_legacy_field_aliases() {
        let json = r#"{
            "youtube_url": "https://x.test/a.mp4",
            "satisfying_urls": ["https://x.test/b.mp4", "https://x.test/c.mp4"],
            "duration": 30
        }"#;
        let req: CompositionRequest = serde_json::from_str(json).unwrap();
        let job = req.into_job().unwrap();

        assert_eq!(job.primary_source_url, "https://x.test/a.mp4");
        assert_eq!(job.bottom_clip_urls.len(), 2);
        assert_eq!(job.target_duration_seconds, 30);
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = CompositionJob::new("https://x.test/a.mp4", vec!["https://x.test/b.mp4".into()], 6);
        let b = CompositionJob::new("https://x.test/a.mp4", vec!["https://x.test/b.mp4".into()], 6);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_stage_progression() {
        let mut stage = JobStage::Created;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            visited.push(stage);
        }

        assert_eq!(
            visited,
            vec![
                JobStage::Created,
                JobStage::AssetsFetched,
                JobStage::BottomConcatenated,
                JobStage::Composed,
                JobStage::Done,
            ]
        );
        assert!(stage.is_terminal());
        assert_eq!(JobStage::BottomConcatenated.to_string(), "bottom_concatenated");
    }
}
