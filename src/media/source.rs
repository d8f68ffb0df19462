use super::types::{AudioPacket, MediaInfo, VideoFrame};
use crate::errors::SourceError;
use async_trait::async_trait;

/// A playable video: metadata first, then real-time frames and audio
#[async_trait(?Send)]
pub trait MediaSource {
    /// Resolve metadata. Fails when the media cannot be read or its
    /// duration is not a positive finite number.
    async fn load(&mut self) -> Result<MediaInfo, SourceError>;

    /// Start playback from the beginning, returning the source's audio
    /// output if it has one
    async fn start(&mut self) -> Result<Option<Box<dyn AudioTap>>, SourceError>;

    /// Wait for the next displayable frame. `Ok(None)` once playback ended.
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError>;

    /// Free decode state and file handles. Safe to call more than once.
    fn release(&mut self);
}

/// Audio output of a playing source, paced by the same clock as its frames
#[async_trait(?Send)]
pub trait AudioTap {
    async fn next_packet(&mut self) -> Result<Option<AudioPacket>, SourceError>;
}

/// Optional secondary audio route, e.g. local speakers
pub trait AudioMonitor {
    fn play(&mut self, packet: &AudioPacket);
}
