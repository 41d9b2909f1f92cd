//! Composition metrics.
//!
//! Recorded through the `metrics` facade; a binary that installs a recorder
//! (the API server does) exports them, otherwise they are no-ops.

use metrics::{counter, histogram};
use reelstack_models::JobStage;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "reelstack_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "reelstack_jobs_failed_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "reelstack_ffmpeg_duration_seconds";
    pub const FETCH_DURATION_SECONDS: &str = "reelstack_fetch_duration_seconds";
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// Record job failed, labelled by the stage it failed at.
pub fn record_job_failed(stage: JobStage) {
    let labels = [("stage", stage.as_str().to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record one encoder invocation (`concat` or `compose`).
pub fn record_ffmpeg_duration(operation: &str, duration_secs: f64) {
    let labels = [("operation", operation.to_string())];
    histogram!(names::FFMPEG_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record one asset fetch (`primary` or `bottom_clip`).
pub fn record_fetch_duration(role: &str, duration_secs: f64) {
    let labels = [("role", role.to_string())];
    histogram!(names::FETCH_DURATION_SECONDS, &labels).record(duration_secs);
}
