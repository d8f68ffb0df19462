mod clock;
mod mp4_source;
mod source;
mod types;

pub use clock::{Clock, PlaybackClock};
pub use mp4_source::{Mp4AudioTap, Mp4Source};
pub use source::{AudioMonitor, AudioTap, MediaSource};
pub use types::{AudioCodecConfig, AudioPacket, AudioTrackInfo, MediaInfo, VideoFrame};
