//! Lossless clip concatenation through the concat demuxer.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::command::{Encoder, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{ensure_non_empty_file, remove_if_exists};

/// Quote a path for a concat manifest `file` directive.
///
/// The demuxer reads single-quoted strings, so an embedded `'` closes the
/// quote, emits an escaped quote and reopens it.
pub fn escape_manifest_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("'{}'", raw.replace('\'', r"'\''"))
}

/// Render a manifest listing `clips` in play order.
pub fn build_manifest(clips: &[PathBuf]) -> String {
    let mut manifest = String::new();
    for clip in clips {
        manifest.push_str("file ");
        manifest.push_str(&escape_manifest_path(clip));
        manifest.push('\n');
    }
    manifest
}

/// Join `clips` in order into `output` without re-encoding.
///
/// All clips must share codec parameters. When they do not, the encoder fails
/// and the failure is reported as [`MediaError::ConcatMismatch`].
pub async fn concatenate(
    encoder: &dyn Encoder,
    clips: &[PathBuf],
    manifest_path: &Path,
    output: &Path,
) -> MediaResult<PathBuf> {
    if clips.is_empty() {
        return Err(MediaError::internal("No clips to concatenate"));
    }

    let mut absolute = Vec::with_capacity(clips.len());
    for clip in clips {
        ensure_non_empty_file(clip).await?;
        absolute.push(fs::canonicalize(clip).await?);
    }

    fs::write(manifest_path, build_manifest(&absolute)).await?;

    let cmd = FfmpegCommand::new(output)
        .concat_input(manifest_path)
        .stream_copy();

    match encoder.run(&cmd).await {
        Ok(()) => {}
        Err(MediaError::FfmpegFailed {
            stderr, exit_code, ..
        }) => {
            warn!(clips = clips.len(), exit_code = ?exit_code, "Concatenation rejected by encoder");
            remove_if_exists(output).await;
            return Err(MediaError::ConcatMismatch { stderr, exit_code });
        }
        Err(e) => {
            remove_if_exists(output).await;
            return Err(e);
        }
    }

    let size_bytes = ensure_non_empty_file(output).await?;
    info!(clips = clips.len(), size_bytes, "Concatenated bottom clips");

    Ok(output.to_path_buf())
}
