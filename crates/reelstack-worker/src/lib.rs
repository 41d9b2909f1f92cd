//! Composition worker.
//!
//! This crate provides:
//! - The `Compositor`, which drives a job from fetch to finished output
//! - Worker configuration from the environment
//! - Structured per-job logging and composition metrics
//! - Output sinks deciding where finished videos end up

pub mod compositor;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use compositor::Compositor;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use sink::{DirectorySink, LocalPathSink, OutputSink};
