//! Where finished outputs go.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reelstack_models::JobId;
use tokio::fs;

use crate::error::{WorkerError, WorkerResult};

/// Receives the finished composite of a job.
///
/// Returns the location the caller should report.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn deliver(&self, job_id: &JobId, output: &Path) -> WorkerResult<PathBuf>;
}

/// Leaves the output in the job workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPathSink;

#[async_trait]
impl OutputSink for LocalPathSink {
    async fn deliver(&self, _job_id: &JobId, output: &Path) -> WorkerResult<PathBuf> {
        Ok(output.to_path_buf())
    }
}

/// Copies each output to `<dir>/<job-id>.mp4`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl OutputSink for DirectorySink {
    async fn deliver(&self, job_id: &JobId, output: &Path) -> WorkerResult<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| WorkerError::delivery(format!("{}: {}", self.dir.display(), e)))?;

        let destination = self.dir.join(format!("{}.mp4", job_id));
        fs::copy(output, &destination)
            .await
            .map_err(|e| WorkerError::delivery(format!("{}: {}", destination.display(), e)))?;

        Ok(destination)
    }
}
