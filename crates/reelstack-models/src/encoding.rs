//! Fixed output canvas and encoding policy.
//!
//! These values are deliberately not configurable per job so that outputs
//! stay comparable across runs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Video codec (H.264)
pub const VIDEO_CODEC: &str = "libx264";
/// Encoder preset (speed/quality trade-off)
pub const PRESET: &str = "medium";
/// Constant Rate Factor
pub const CRF: u8 = 23;
/// Audio codec
pub const AUDIO_CODEC: &str = "aac";
/// Audio bitrate
pub const AUDIO_BITRATE: &str = "128k";
/// Output frame rate
pub const FRAME_RATE: u32 = 30;
/// Output pixel format
pub const PIXEL_FORMAT: &str = "yuv420p";

/// Vertical 9:16 canvas width
pub const CANVAS_WIDTH: u32 = 1080;
/// Vertical 9:16 canvas height
pub const CANVAS_HEIGHT: u32 = 1920;
/// Height of the top (primary) region
pub const TOP_HEIGHT: u32 = 1280;
/// Height of the bottom (looped clips) region
pub const BOTTOM_HEIGHT: u32 = CANVAS_HEIGHT - TOP_HEIGHT;

/// Container extension for every video artifact.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Output canvas and its split between the two regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub top_height: u32,
}

impl Canvas {
    pub fn bottom_height(&self) -> u32 {
        self.height.saturating_sub(self.top_height)
    }

    /// Fraction of the canvas height given to the top region.
    pub fn top_fraction(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.top_height as f64 / self.height as f64
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            top_height: TOP_HEIGHT,
        }
    }
}

/// Encoder settings applied to the final composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct EncodingPolicy {
    pub video_codec: &'static str,
    pub preset: &'static str,
    pub crf: u8,
    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub frame_rate: u32,
    pub pixel_format: &'static str,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self {
            video_codec: VIDEO_CODEC,
            preset: PRESET,
            crf: CRF,
            audio_codec: AUDIO_CODEC,
            audio_bitrate: AUDIO_BITRATE,
            frame_rate: FRAME_RATE,
            pixel_format: PIXEL_FORMAT,
        }
    }
}
