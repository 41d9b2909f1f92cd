//! Filter graph for the stacked vertical layout.
//!
//! Both regions use the same cover policy: scale up until the region is fully
//! covered while keeping the aspect ratio, then center-crop to the exact
//! region size. Nothing is padded, so inputs whose aspect ratio differs from
//! the region lose some edge content.
//!
//! For the default 1080x1920 canvas the rendered graph is:
//!
//! ```text
//! [0:v]scale=1080:1280:force_original_aspect_ratio=increase,crop=1080:1280:(iw-ow)/2:(ih-oh)/2,setsar=1[top];
//! [1:v]scale=1080:640:force_original_aspect_ratio=increase,crop=1080:640:(iw-ow)/2:(ih-oh)/2,setsar=1[bottom];
//! [top][bottom]vstack=inputs=2[v]
//! ```

use reelstack_models::Canvas;
use serde::Serialize;

use crate::error::{MediaError, MediaResult};

/// Label of the stacked output stream.
pub const OUTPUT_LABEL: &str = "v";

const TOP_LABEL: &str = "top";
const BOTTOM_LABEL: &str = "bottom";

/// Encoder input a region reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRef {
    /// Input 0: the primary video
    Primary,
    /// Input 1: the concatenated bottom clip
    BottomLooped,
}

impl InputRef {
    pub fn index(&self) -> usize {
        match self {
            InputRef::Primary => 0,
            InputRef::BottomLooped => 1,
        }
    }

    /// Stream specifier for this input's video, e.g. `0:v`.
    pub fn video_stream(&self) -> String {
        format!("{}:v", self.index())
    }
}

/// How often an input is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    Once,
    /// Restart from the beginning whenever the input ends
    Infinite,
}

/// One region of the canvas and the input that fills it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionChain {
    pub source: InputRef,
    pub width: u32,
    pub height: u32,
    pub loop_mode: LoopMode,
    pub label: &'static str,
}

impl RegionChain {
    /// Render as `[N:v]scale=...,crop=...,setsar=1[label]`.
    pub fn to_filter(&self) -> String {
        format!(
            "[{src}]scale={w}:{h}:force_original_aspect_ratio=increase,\
             crop={w}:{h}:(iw-ow)/2:(ih-oh)/2,setsar=1[{label}]",
            src = self.source.video_stream(),
            w = self.width,
            h = self.height,
            label = self.label,
        )
    }
}

/// Declarative description of the compositing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterGraphSpec {
    pub output_width: u32,
    pub output_height: u32,
    pub top: RegionChain,
    pub bottom: RegionChain,
}

impl FilterGraphSpec {
    /// Build a graph from explicit region heights.
    pub fn new(
        output_width: u32,
        output_height: u32,
        top_height: u32,
        bottom_height: u32,
    ) -> MediaResult<Self> {
        if output_width == 0 || output_height == 0 {
            return Err(MediaError::graph_build(format!(
                "canvas {}x{} has a zero dimension",
                output_width, output_height
            )));
        }
        if top_height == 0 || bottom_height == 0 {
            return Err(MediaError::graph_build(format!(
                "region heights {}/{} must both be non-zero",
                top_height, bottom_height
            )));
        }
        if top_height.checked_add(bottom_height) != Some(output_height) {
            return Err(MediaError::graph_build(format!(
                "region heights {} + {} do not add up to canvas height {}",
                top_height, bottom_height, output_height
            )));
        }
        // yuv420p subsamples chroma by two in both directions
        for (name, value) in [
            ("width", output_width),
            ("top height", top_height),
            ("bottom height", bottom_height),
        ] {
            if value % 2 != 0 {
                return Err(MediaError::graph_build(format!(
                    "{} {} is odd; yuv420p needs even dimensions",
                    name, value
                )));
            }
        }

        Ok(Self {
            output_width,
            output_height,
            top: RegionChain {
                source: InputRef::Primary,
                width: output_width,
                height: top_height,
                loop_mode: LoopMode::Once,
                label: TOP_LABEL,
            },
            bottom: RegionChain {
                source: InputRef::BottomLooped,
                width: output_width,
                height: bottom_height,
                loop_mode: LoopMode::Infinite,
                label: BOTTOM_LABEL,
            },
        })
    }

    /// Build a graph from the share of the height given to the top region.
    ///
    /// The top height is rounded to the nearest even number.
    pub fn from_fraction(output_width: u32, output_height: u32, top_fraction: f64) -> MediaResult<Self> {
        if !(top_fraction > 0.0 && top_fraction < 1.0) {
            return Err(MediaError::graph_build(format!(
                "top fraction {} must be strictly between 0 and 1",
                top_fraction
            )));
        }
        let top_height = ((f64::from(output_height) * top_fraction / 2.0).round() as u32) * 2;
        let bottom_height = output_height.saturating_sub(top_height);
        Self::new(output_width, output_height, top_height, bottom_height)
    }

    pub fn from_canvas(canvas: &Canvas) -> MediaResult<Self> {
        Self::new(
            canvas.width,
            canvas.height,
            canvas.top_height,
            canvas.bottom_height(),
        )
    }

    pub fn top_height(&self) -> u32 {
        self.top.height
    }

    pub fn bottom_height(&self) -> u32 {
        self.bottom.height
    }

    /// Stream specifier to pass to `-map`.
    pub fn output_map(&self) -> String {
        format!("[{}]", OUTPUT_LABEL)
    }

    /// Textual `-filter_complex` description.
    pub fn to_filter_complex(&self) -> String {
        format!(
            "{};{};[{}][{}]vstack=inputs=2[{}]",
            self.top.to_filter(),
            self.bottom.to_filter(),
            self.top.label,
            self.bottom.label,
            OUTPUT_LABEL
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_canvas_graph() {
        let graph = FilterGraphSpec::from_canvas(&Canvas::default()).unwrap();
        assert_eq!(graph.top_height(), 1280);
        assert_eq!(graph.bottom_height(), 640);
        assert_eq!(graph.top.source, InputRef::Primary);
        assert_eq!(graph.bottom.source, InputRef::BottomLooped);
        assert_eq!(graph.top.loop_mode, LoopMode::Once);
        assert_eq!(graph.bottom.loop_mode, LoopMode::Infinite);

        assert_eq!(
            graph.to_filter_complex(),
            "[0:v]scale=1080:1280:force_original_aspect_ratio=increase,\
             crop=1080:1280:(iw-ow)/2:(ih-oh)/2,setsar=1[top];\
             [1:v]scale=1080:640:force_original_aspect_ratio=increase,\
             crop=1080:640:(iw-ow)/2:(ih-oh)/2,setsar=1[bottom];\
             [top][bottom]vstack=inputs=2[v]"
        );
        assert_eq!(graph.output_map(), "[v]");
    }

    #[test]
    fn test_from_fraction_matches_explicit_heights() {
        let by_fraction = FilterGraphSpec::from_fraction(1080, 1920, 2.0 / 3.0).unwrap();
        let explicit = FilterGraphSpec::new(1080, 1920, 1280, 640).unwrap();
        assert_eq!(by_fraction, explicit);

        let half = FilterGraphSpec::from_fraction(720, 1280, 0.5).unwrap();
        assert_eq!(half.top_height(), 640);
        assert_eq!(half.bottom_height(), 640);
    }

    #[test]
    fn test_from_fraction_rounds_to_even() {
        let graph = FilterGraphSpec::from_fraction(1080, 1920, 0.6).unwrap();
        assert_eq!(graph.top_height() % 2, 0);
        assert_eq!(graph.top_height() + graph.bottom_height(), 1920);
    }

    #[test]
    fn test_mismatched_heights_rejected() {
        let err = FilterGraphSpec::new(1080, 1920, 1280, 600).unwrap_err();
        assert!(matches!(err, MediaError::GraphBuild(_)));
    }

    #[test]
    fn test_degenerate_geometry_rejected() {
        assert!(FilterGraphSpec::new(0, 1920, 1280, 640).is_err());
        assert!(FilterGraphSpec::new(1080, 1920, 1920, 0).is_err());
        assert!(FilterGraphSpec::new(1081, 1920, 1280, 640).is_err());
        assert!(FilterGraphSpec::new(1080, 1921, 1281, 640).is_err());
        assert!(FilterGraphSpec::from_fraction(1080, 1920, 0.0).is_err());
        assert!(FilterGraphSpec::from_fraction(1080, 1920, 1.0).is_err());
        assert!(FilterGraphSpec::from_fraction(1080, 1920, f64::NAN).is_err());
    }
}
