//! FFmpeg CLI wrapper for vertical video composition.
//!
//! This crate provides:
//! - Asset staging over HTTP(S) into per-job workspaces
//! - Lossless clip concatenation via the concat demuxer
//! - The stacked top/bottom filter graph
//! - The final composite encode and output probing

pub mod command;
pub mod compose;
pub mod concat;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, Encoder, FfmpegCommand, FfmpegRunner};
pub use compose::{build_compose_command, compose};
pub use concat::{build_manifest, concatenate, escape_manifest_path};
pub use error::{MediaError, MediaResult};
pub use fetch::{stage_asset, AssetFetcher, HttpFetcher};
pub use filters::{FilterGraphSpec, InputRef, LoopMode};
pub use probe::{check_output, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use workspace::{Artifact, JobWorkspace, WorkspaceManager};
