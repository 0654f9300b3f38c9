//! Operation kinds and their parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::media_kind::MediaKind;

/// Smallest accepted output dimension in pixels.
pub const MIN_DIMENSION: u32 = 16;
/// Largest accepted output dimension in pixels (8K UHD width).
pub const MAX_DIMENSION: u32 = 7680;
/// Largest accepted synthesized frame rate.
pub const MAX_FPS: u32 = 120;

/// Default synthesized resolution.
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
/// Default synthesized frame rate.
pub const DEFAULT_FPS: u32 = 30;

/// Kind of media operation a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Merge several videos into one
    Merge,
    /// Turn one audio file into a video with a solid background
    AudioToVideo,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Merge => "merge",
            OperationKind::AudioToVideo => "audio_to_video",
        }
    }

    /// Kind of file the operation accepts as input.
    pub fn input_kind(&self) -> MediaKind {
        match self {
            OperationKind::Merge => MediaKind::Video,
            OperationKind::AudioToVideo => MediaKind::Audio,
        }
    }

    /// Minimum number of input files.
    pub fn min_inputs(&self) -> usize {
        match self {
            OperationKind::Merge => 2,
            OperationKind::AudioToVideo => 1,
        }
    }

    /// Maximum number of input files, if bounded.
    pub fn max_inputs(&self) -> Option<usize> {
        match self {
            OperationKind::Merge => None,
            OperationKind::AudioToVideo => Some(1),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How merged videos are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    /// Play inputs back to back in the supplied order
    #[default]
    Concatenate,
    /// Picture-in-picture: later inputs in the corners of the first
    Overlay,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Concatenate => "concatenate",
            MergeMethod::Overlay => "overlay",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MergeMethod {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concatenate" => Ok(MergeMethod::Concatenate),
            "overlay" => Ok(MergeMethod::Overlay),
            _ => Err(ParamError::UnknownMergeMethod(s.to_string())),
        }
    }
}

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Color in the `0xRRGGBB` form understood by FFmpeg.
    pub fn to_ffmpeg_hex(&self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parameters of the audio-to-video synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SynthesisParams {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub color: RgbColor,
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            fps: DEFAULT_FPS,
            color: RgbColor::BLACK,
        }
    }
}

impl SynthesisParams {
    /// Check dimensions and frame rate against the accepted ranges.
    pub fn validate(&self) -> Result<(), ParamError> {
        for (name, value) in [
            ("width", self.resolution.width),
            ("height", self.resolution.height),
        ] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
                return Err(ParamError::DimensionOutOfRange { name, value });
            }
            // yuv420p subsamples chroma by two in both directions.
            if value % 2 != 0 {
                return Err(ParamError::OddDimension { name, value });
            }
        }

        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(ParamError::FpsOutOfRange(self.fps));
        }

        Ok(())
    }
}

/// Operation-specific parameters of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationParams {
    Merge { method: MergeMethod },
    AudioToVideo(SynthesisParams),
}

impl OperationParams {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationParams::Merge { .. } => OperationKind::Merge,
            OperationParams::AudioToVideo(_) => OperationKind::AudioToVideo,
        }
    }

    /// Validate parameters and the number of inputs they will run on.
    pub fn validate(&self, input_count: usize) -> Result<(), ParamError> {
        if let OperationParams::AudioToVideo(params) = self {
            params.validate()?;
        }

        let kind = self.kind();
        if input_count < kind.min_inputs() {
            return Err(ParamError::TooFewInputs {
                kind,
                required: kind.min_inputs(),
                found: input_count,
            });
        }
        if let Some(max) = kind.max_inputs() {
            if input_count > max {
                return Err(ParamError::TooManyInputs {
                    kind,
                    allowed: max,
                    found: input_count,
                });
            }
        }

        Ok(())
    }
}

/// Invalid operation parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("Unknown merge method: {0}")]
    UnknownMergeMethod(String),

    #[error("Invalid {name}: {value} (must be between 16 and 7680)")]
    DimensionOutOfRange { name: &'static str, value: u32 },

    #[error("Invalid {name}: {value} (must be an even number)")]
    OddDimension { name: &'static str, value: u32 },

    #[error("Invalid fps: {0} (must be between 1 and 120)")]
    FpsOutOfRange(u32),

    #[error("{kind} requires at least {required} input file(s), got {found}")]
    TooFewInputs {
        kind: OperationKind,
        required: usize,
        found: usize,
    },

    #[error("{kind} accepts at most {allowed} input file(s), got {found}")]
    TooManyInputs {
        kind: OperationKind,
        allowed: usize,
        found: usize,
    },

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_method_parsing() {
        assert_eq!("concatenate".parse::<MergeMethod>().unwrap(), MergeMethod::Concatenate);
        assert_eq!(" Overlay ".parse::<MergeMethod>().unwrap(), MergeMethod::Overlay);
        assert!("stack".parse::<MergeMethod>().is_err());
        assert_eq!(MergeMethod::default(), MergeMethod::Concatenate);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(RgbColor::new(255, 0, 0).to_ffmpeg_hex(), "0xFF0000");
        assert_eq!(RgbColor::BLACK.to_ffmpeg_hex(), "0x000000");
        assert_eq!(RgbColor::new(1, 171, 205).to_ffmpeg_hex(), "0x01ABCD");
    }

    #[test]
    fn test_synthesis_defaults() {
        let params = SynthesisParams::default();
        assert_eq!(params.resolution, Resolution::new(1920, 1080));
        assert_eq!(params.fps, 30);
        assert_eq!(params.color, RgbColor::BLACK);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_synthesis_validation() {
        let mut params = SynthesisParams::default();
        params.fps = 0;
        assert_eq!(params.validate(), Err(ParamError::FpsOutOfRange(0)));

        params.fps = 24;
        params.resolution = Resolution::new(8, 480);
        assert!(matches!(
            params.validate(),
            Err(ParamError::DimensionOutOfRange { name: "width", value: 8 })
        ));
    }

    #[test]
    fn test_synthesis_rejects_odd_dimensions() {
        let mut params = SynthesisParams::default();
        params.resolution = Resolution::new(641, 480);
        assert_eq!(
            params.validate(),
            Err(ParamError::OddDimension { name: "width", value: 641 })
        );

        params.resolution = Resolution::new(640, 481);
        assert_eq!(
            params.validate(),
            Err(ParamError::OddDimension { name: "height", value: 481 })
        );
        assert_eq!(
            params.validate().unwrap_err().to_string(),
            "Invalid height: 481 (must be an even number)"
        );

        params.resolution = Resolution::new(640, 480);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_input_count_validation() {
        let merge = OperationParams::Merge {
            method: MergeMethod::Concatenate,
        };
        assert!(merge.validate(2).is_ok());
        assert!(merge.validate(7).is_ok());
        assert!(matches!(
            merge.validate(1),
            Err(ParamError::TooFewInputs { required: 2, found: 1, .. })
        ));

        let audio = OperationParams::AudioToVideo(SynthesisParams::default());
        assert!(audio.validate(1).is_ok());
        assert!(matches!(
            audio.validate(0),
            Err(ParamError::TooFewInputs { .. })
        ));
        assert!(matches!(
            audio.validate(2),
            Err(ParamError::TooManyInputs { allowed: 1, .. })
        ));
    }

    #[test]
    fn test_operation_kind_inputs() {
        assert_eq!(OperationKind::Merge.input_kind(), MediaKind::Video);
        assert_eq!(OperationKind::AudioToVideo.input_kind(), MediaKind::Audio);
        assert_eq!(
            OperationParams::AudioToVideo(SynthesisParams::default()).kind(),
            OperationKind::AudioToVideo
        );
    }
}
