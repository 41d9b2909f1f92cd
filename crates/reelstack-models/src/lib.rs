//! Shared data models for ReelStack.
//!
//! This crate provides Serde-serializable types for:
//! - Composition jobs and their validation
//! - Staged assets and workspace roles
//! - The fixed encoding policy and output canvas
//! - Composition results reported back to callers

pub mod asset;
pub mod encoding;
pub mod job;
pub mod result;

// Re-export common types
pub use asset::{AssetRole, StagedAsset};
pub use encoding::{Canvas, EncodingPolicy};
pub use job::{
    CompositionJob, CompositionRequest, JobId, JobStage, ValidationError,
    DEFAULT_TARGET_DURATION_SECS,
};
pub use result::{CompositionFailure, CompositionResult, FailureClass};
