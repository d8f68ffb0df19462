use bytes::Bytes;
use image::RgbaImage;

/// Metadata resolved while preparing a source
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Seconds; always finite and positive once loaded
    pub duration: f64,
    pub frame_rate: f64,
    pub audio: Option<AudioTrackInfo>,
}

/// Layout of the compressed audio track carried through to the output
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioTrackInfo {
    pub timescale: u32,
    pub bitrate: u32,
    pub codec: AudioCodecConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AudioCodecConfig {
    /// MPEG-4 AAC, raw values of the AudioSpecificConfig fields
    Aac {
        object_type: u8,
        freq_index: u8,
        channel_config: u8,
    },
}

/// A decoded frame at its presentation time in seconds
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image: RgbaImage,
    pub pts: f64,
}

/// One compressed audio access unit, passed through unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPacket {
    /// In `timescale` units
    pub start_time: u64,
    pub duration: u32,
    pub timescale: u32,
    pub is_sync: bool,
    pub bytes: Bytes,
}

impl AudioPacket {
    pub fn start_seconds(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.start_time as f64 / self.timescale as f64
    }
}
