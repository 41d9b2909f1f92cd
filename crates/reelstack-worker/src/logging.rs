//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for composition jobs with
//! tracing spans and contextual information.

use reelstack_models::{JobId, JobStage};
use tracing::{error, info, warn, Span};

/// Job logger for structured logging with consistent formatting.
///
/// Every event carries the job ID and operation name so that the lines of
/// one job can be filtered out of interleaved concurrent output.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    /// Create a new job logger for a specific job and operation.
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log that the job reached a stage.
    pub fn log_stage(&self, stage: JobStage, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = %stage,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    /// Log a failure together with the stage it happened at.
    pub fn log_failure(&self, stage: JobStage, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = %stage,
            "Job failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}
