//! Composition outcome reported to callers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{JobId, JobStage};

/// Broad class of a failure, so callers can tell bad input from
/// network or encoder trouble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    BadInput,
    Network,
    Encode,
    Internal,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::BadInput => "bad_input",
            FailureClass::Network => "network",
            FailureClass::Encode => "encode",
            FailureClass::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why and where a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompositionFailure {
    /// Stage the job was trying to reach
    pub stage: JobStage,
    pub class: FailureClass,
    pub message: String,
    /// Encoder stderr, verbatim, when the encoder produced any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

/// Outcome of one job. Exactly one of output path or failure is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompositionResult {
    Succeeded { job_id: JobId, output_path: PathBuf },
    Failed { job_id: JobId, failure: CompositionFailure },
}

impl CompositionResult {
    pub fn job_id(&self) -> &JobId {
        match self {
            CompositionResult::Succeeded { job_id, .. } => job_id,
            CompositionResult::Failed { job_id, .. } => job_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompositionResult::Succeeded { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match self {
            CompositionResult::Succeeded { output_path, .. } => Some(output_path),
            CompositionResult::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&CompositionFailure> {
        match self {
            CompositionResult::Succeeded { .. } => None,
            CompositionResult::Failed { failure, .. } => Some(failure),
        }
    }
}
