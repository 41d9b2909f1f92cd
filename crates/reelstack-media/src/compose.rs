//! Final composite encode.

use std::path::{Path, PathBuf};
use std::time::Instant;

use reelstack_models::EncodingPolicy;
use tracing::info;

use crate::command::{Encoder, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::filters::{FilterGraphSpec, LoopMode};
use crate::fs_utils::{ensure_non_empty_file, remove_if_exists};

/// Build the encoder command for the stacked composite.
///
/// Input 0 is the primary video, read once. Input 1 is the concatenated
/// bottom clip, read in a loop when the graph asks for it. Primary audio is
/// mapped optionally so a silent primary yields a video-only output.
pub fn build_compose_command(
    primary: &Path,
    bottom: &Path,
    graph: &FilterGraphSpec,
    duration_secs: u32,
    policy: &EncodingPolicy,
    output: &Path,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(output).input(primary);
    let cmd = match graph.bottom.loop_mode {
        LoopMode::Infinite => cmd.looped_input(bottom),
        LoopMode::Once => cmd.input(bottom),
    };

    cmd.filter_complex(graph.to_filter_complex())
        .map(graph.output_map())
        .map("0:a?")
        .duration(duration_secs)
        .video_codec(policy.video_codec)
        .preset(policy.preset)
        .crf(policy.crf)
        .audio_codec(policy.audio_codec)
        .audio_bitrate(policy.audio_bitrate)
        .frame_rate(policy.frame_rate)
        .pixel_format(policy.pixel_format)
        .faststart()
}

/// Render the composite to `output`, trimmed to `duration_secs`.
///
/// On failure any file the encoder left at `output` is deleted.
pub async fn compose(
    encoder: &dyn Encoder,
    primary: &Path,
    bottom: &Path,
    graph: &FilterGraphSpec,
    duration_secs: u32,
    policy: &EncodingPolicy,
    output: &Path,
) -> MediaResult<PathBuf> {
    if duration_secs == 0 {
        return Err(MediaError::internal("Composite duration must be positive"));
    }
    ensure_non_empty_file(primary).await?;
    ensure_non_empty_file(bottom).await?;

    let start = Instant::now();
    let cmd = build_compose_command(primary, bottom, graph, duration_secs, policy, output);

    if let Err(e) = encoder.run(&cmd).await {
        remove_if_exists(output).await;
        return Err(e);
    }

    let size_bytes = match ensure_non_empty_file(output).await {
        Ok(size) => size,
        Err(_) => {
            remove_if_exists(output).await;
            return Err(MediaError::ffmpeg_failed(
                "Encoder exited successfully but produced no output",
                None,
                Some(0),
            ));
        }
    };

    info!(
        width = graph.output_width,
        height = graph.output_height,
        duration_secs,
        size_bytes,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Composed vertical video"
    );

    Ok(output.to_path_buf())
}
