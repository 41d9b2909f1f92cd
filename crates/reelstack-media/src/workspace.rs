//! Per-job workspace directories.
//!
//! Every run of a job gets `<root>/<job-id>-<run>/`, where `<run>` is a
//! random suffix, and all of its staged inputs, intermediates and the final
//! output live at fixed names inside it:
//!
//! ```text
//! <root>/<job-id>-<run>/
//!   primary.mp4
//!   bottom_<i>.mp4
//!   concat_manifest.txt
//!   bottom_concatenated.mp4
//!   output.mp4
//! ```

use std::path::{Path, PathBuf};

use reelstack_models::encoding::OUTPUT_EXTENSION;
use reelstack_models::{AssetRole, JobId};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// A file that lives in a job workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// A staged input
    Asset(AssetRole),
    /// Concat demuxer manifest
    ConcatManifest,
    /// Bottom clips joined into one file
    BottomConcatenated,
    /// Final composite
    Output,
}

impl Artifact {
    /// File name of the artifact inside the workspace.
    pub fn file_name(&self) -> String {
        match self {
            Artifact::Asset(AssetRole::Primary) => format!("primary.{}", OUTPUT_EXTENSION),
            Artifact::Asset(AssetRole::BottomClip(i)) => format!("bottom_{}.{}", i, OUTPUT_EXTENSION),
            Artifact::ConcatManifest => "concat_manifest.txt".to_string(),
            Artifact::BottomConcatenated => format!("bottom_concatenated.{}", OUTPUT_EXTENSION),
            Artifact::Output => format!("output.{}", OUTPUT_EXTENSION),
        }
    }
}

/// Allocates job workspaces under a configured root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh workspace directory for one run of a job.
    ///
    /// Resubmitting the same job yields a new directory. Creation fails if
    /// the directory already exists, so two runs can never share one.
    pub async fn create_job_workspace(&self, job_id: &JobId) -> MediaResult<JobWorkspace> {
        if !is_safe_dir_name(job_id.as_str()) {
            return Err(MediaError::InvalidJobId(job_id.to_string()));
        }

        fs::create_dir_all(&self.root).await?;
        // Manifest entries must be absolute, so resolve the root once here
        let root = fs::canonicalize(&self.root).await?;
        let run = Uuid::new_v4().simple().to_string();
        let dir = root.join(format!("{}-{}", job_id, &run[..8]));

        match fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(MediaError::WorkspaceExists(dir));
            }
            Err(e) => return Err(MediaError::from(e)),
        }

        info!(job_id = %job_id, workspace = %dir.display(), "Created job workspace");

        Ok(JobWorkspace {
            job_id: job_id.clone(),
            dir,
        })
    }
}

/// Directory exclusively owned by one job.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    job_id: JobId,
    dir: PathBuf,
}

impl JobWorkspace {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Absolute path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Deterministic path of an artifact within this workspace.
    pub fn path_for(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    /// Delete the workspace and everything in it.
    pub async fn remove(self) -> MediaResult<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                debug!(job_id = %self.job_id, "Removed job workspace");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(job_id = %self.job_id, "Failed to remove workspace: {}", e);
                Err(MediaError::from(e))
            }
        }
    }
}

fn is_safe_dir_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
