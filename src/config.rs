//! Export configuration

use crate::errors::{SubburnError, SubburnResult};
use crate::export::{OutputFormat, VideoCodec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Bitrate ceiling shared by every negotiated format
    pub video_bitrate_bps: u32,

    /// Capture frame rate hint for the encoder
    pub max_frame_rate: f64,

    /// Negotiation order, preferred first
    pub preferred_formats: Vec<VideoCodec>,

    /// Also route source audio to the secondary monitor sink
    pub monitor_audio: bool,

    /// TTF/OTF font for caption rendering
    pub font_path: Option<PathBuf>,

    /// Capacity of the queue feeding the encoder sink
    pub frame_queue_depth: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            video_bitrate_bps: 5_000_000,
            max_frame_rate: 30.0,
            preferred_formats: vec![VideoCodec::H264High, VideoCodec::H264Baseline],
            monitor_audio: false,
            font_path: None,
            frame_queue_depth: 8,
        }
    }
}

impl ExportConfig {
    pub fn from_toml_str(text: &str) -> SubburnResult<Self> {
        let config: ExportConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> SubburnResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SubburnError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SubburnResult<()> {
        if self.video_bitrate_bps == 0 {
            return Err(SubburnError::Config("video_bitrate_bps must be positive".into()));
        }
        if !(self.max_frame_rate.is_finite() && self.max_frame_rate > 0.0) {
            return Err(SubburnError::Config(format!(
                "max_frame_rate must be positive, got {}",
                self.max_frame_rate
            )));
        }
        if self.preferred_formats.is_empty() {
            return Err(SubburnError::Config("preferred_formats is empty".into()));
        }
        if self.frame_queue_depth == 0 {
            return Err(SubburnError::Config("frame_queue_depth must be positive".into()));
        }
        Ok(())
    }

    /// Formats to offer the encoder, in order, all at the same bitrate
    pub fn output_formats(&self) -> Vec<OutputFormat> {
        self.preferred_formats
            .iter()
            .map(|codec| OutputFormat::new(*codec, self.video_bitrate_bps))
            .collect()
    }
}
