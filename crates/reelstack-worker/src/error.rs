//! Worker error types.

use reelstack_media::MediaError;
use reelstack_models::{CompositionFailure, FailureClass, JobStage, ValidationError};
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    Validation(#[from] ValidationError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        /// Stage the job was trying to reach
        stage: JobStage,
        #[source]
        source: MediaError,
    },

    #[error("Output delivery failed: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WorkerError {
    pub fn stage(stage: JobStage, source: MediaError) -> Self {
        Self::Stage { stage, source }
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Stage at which the job failed.
    pub fn failed_stage(&self) -> JobStage {
        match self {
            WorkerError::Validation(_) | WorkerError::ConfigError(_) => JobStage::Created,
            WorkerError::Stage { stage, .. } => *stage,
            WorkerError::Delivery(_) => JobStage::Done,
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            WorkerError::Validation(_) => FailureClass::BadInput,
            WorkerError::Stage { stage, source } => {
                if source.is_fetch_error() {
                    FailureClass::Network
                } else if *stage == JobStage::AssetsFetched
                    && matches!(source, MediaError::EmptyAsset(_))
                {
                    // Remote answered with an empty body
                    FailureClass::Network
                } else if source.is_encode_error() || matches!(source, MediaError::Timeout(_)) {
                    FailureClass::Encode
                } else {
                    FailureClass::Internal
                }
            }
            WorkerError::Delivery(_) | WorkerError::ConfigError(_) => FailureClass::Internal,
        }
    }

    /// Encoder stderr carried by the underlying failure.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            WorkerError::Stage { source, .. } => source.diagnostics(),
            _ => None,
        }
    }

    pub fn to_failure(&self) -> CompositionFailure {
        CompositionFailure {
            stage: self.failed_stage(),
            class: self.class(),
            message: self.to_string(),
            diagnostics: self.diagnostics().map(str::to_string),
        }
    }
}
