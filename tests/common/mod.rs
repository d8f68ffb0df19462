#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use subburn::compositor::{Paint, Surface, SurfaceProvider};
use subburn::errors::{EncodeError, SourceError, SurfaceError};
use subburn::export::{Encoder, EncoderSink, Mp4Encoder, OutputFormat, StreamLayout, VideoCodec};
use subburn::media::{
    AudioCodecConfig, AudioMonitor, AudioPacket, AudioTap, AudioTrackInfo, Clock, MediaInfo,
    MediaSource, VideoFrame,
};

pub const SOURCE_GRAY: Rgba<u8> = Rgba([90, 90, 90, 255]);

/// Clock moved by hand, here by the fake source as it hands out frames
#[derive(Debug, Default)]
pub struct ManualClock {
    position: Mutex<f64>,
}

impl ManualClock {
    pub fn set(&self, position: f64) {
        *self.position.lock().unwrap() = position;
    }
}

impl Clock for ManualClock {
    fn position(&self) -> f64 {
        *self.position.lock().unwrap()
    }
}

/// In-memory source: uniform gray frames at a fixed rate
pub struct FakeSource {
    pub info: Option<MediaInfo>,
    pub clock: Arc<ManualClock>,
    pub audio_packets: u32,
    pub fail_at_frame: Option<u32>,
    /// Wall seconds that pass per media second, above 1.0 when decoding is slow
    pub clock_rate: f64,
    pub released: Arc<AtomicUsize>,
    next: u32,
    started: bool,
}

impl FakeSource {
    pub fn new(clock: Arc<ManualClock>, width: u32, height: u32, duration: f64, frame_rate: f64) -> Self {
        Self {
            info: Some(MediaInfo {
                width,
                height,
                duration,
                frame_rate,
                audio: Some(aac_info()),
            }),
            clock,
            audio_packets: 0,
            fail_at_frame: None,
            clock_rate: 1.0,
            released: Arc::new(AtomicUsize::new(0)),
            next: 0,
            started: false,
        }
    }

    pub fn unreadable(clock: Arc<ManualClock>) -> Self {
        let mut source = Self::new(clock, 0, 0, 0.0, 0.0);
        source.info = None;
        source
    }

    fn frame_total(&self) -> u32 {
        self.info
            .as_ref()
            .map(|info| (info.duration * info.frame_rate).round() as u32)
            .unwrap_or(0)
    }
}

#[async_trait(?Send)]
impl MediaSource for FakeSource {
    async fn load(&mut self) -> Result<MediaInfo, SourceError> {
        self.info
            .clone()
            .ok_or_else(|| SourceError::Open("fake source has no media".to_string()))
    }

    async fn start(&mut self) -> Result<Option<Box<dyn AudioTap>>, SourceError> {
        self.started = true;
        self.clock.set(0.0);
        if self.audio_packets == 0 {
            return Ok(None);
        }
        Ok(Some(Box::new(FakeAudioTap {
            remaining: self.audio_packets,
            sent: 0,
        })))
    }

    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        if !self.started {
            return Err(SourceError::NotLoaded);
        }
        if Some(self.next) == self.fail_at_frame {
            return Err(SourceError::Decode("corrupt sample".to_string()));
        }
        if self.next >= self.frame_total() {
            return Ok(None);
        }
        tokio::task::yield_now().await;

        let info = self.info.as_ref().ok_or(SourceError::NotLoaded)?;
        let pts = self.next as f64 / info.frame_rate;
        self.next += 1;
        self.clock.set(pts * self.clock_rate);
        Ok(Some(VideoFrame {
            image: RgbaImage::from_pixel(info.width, info.height, SOURCE_GRAY),
            pts,
        }))
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn aac_info() -> AudioTrackInfo {
    AudioTrackInfo {
        timescale: 48_000,
        bitrate: 128_000,
        codec: AudioCodecConfig::Aac {
            object_type: 2,
            freq_index: 3,
            channel_config: 2,
        },
    }
}

pub struct FakeAudioTap {
    remaining: u32,
    sent: u64,
}

#[async_trait(?Send)]
impl AudioTap for FakeAudioTap {
    async fn next_packet(&mut self) -> Result<Option<AudioPacket>, SourceError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        tokio::task::yield_now().await;
        self.remaining -= 1;
        let packet = AudioPacket {
            start_time: self.sent * 1024,
            duration: 1024,
            timescale: 48_000,
            is_sync: true,
            bytes: Bytes::from_static(&[0x21, 0x00, 0x49, 0x90]),
        };
        self.sent += 1;
        Ok(Some(packet))
    }
}

#[derive(Clone, Default)]
pub struct CountingMonitor {
    pub played: Arc<AtomicUsize>,
}

impl AudioMonitor for CountingMonitor {
    fn play(&mut self, _packet: &AudioPacket) {
        self.played.fetch_add(1, Ordering::SeqCst);
    }
}

/// Paints text as solid boxes: outline black, fill white
pub struct BlockSurface {
    canvas: RgbaImage,
}

impl BlockSurface {
    fn paint_box(&mut self, text: &str, x: f32, y: f32, grow: f32, paint: &Paint) {
        let half_width = text.chars().count() as f32 * paint.font_size * 0.5 + grow;
        let (width, height) = self.canvas.dimensions();
        let left = (x - half_width).floor().max(0.0) as u32;
        let right = ((x + half_width).ceil() as u32).min(width);
        let top = (y - paint.font_size - grow).floor().max(0.0) as u32;
        let bottom = ((y + grow).ceil() as u32).min(height);
        let color = Rgba([paint.color.0[0], paint.color.0[1], paint.color.0[2], 255]);
        for py in top..bottom {
            for px in left..right {
                self.canvas.put_pixel(px, py, color);
            }
        }
    }
}

impl Surface for BlockSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn draw_frame(&mut self, frame: &RgbaImage) {
        self.canvas = frame.clone();
    }

    fn stroke_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint) {
        self.paint_box(text, x, y, paint.line_width / 2.0, paint);
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint) {
        self.paint_box(text, x, y, 0.0, paint);
    }

    fn snapshot(&self) -> RgbaImage {
        self.canvas.clone()
    }
}

#[derive(Default)]
pub struct BlockSurfaces {
    pub fail: bool,
}

impl SurfaceProvider for BlockSurfaces {
    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError> {
        if self.fail || width == 0 || height == 0 {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        Ok(Box::new(BlockSurface {
            canvas: RgbaImage::new(width, height),
        }))
    }
}

/// What the recording sink saw, shared with the test
#[derive(Default)]
pub struct Recorded {
    pub frames: Vec<(RgbaImage, f64)>,
    pub audio: usize,
    pub finished: bool,
    pub aborted: bool,
    pub layouts: Vec<StreamLayout>,
    pub attempted: Vec<VideoCodec>,
}

/// Encoder that keeps every frame and emits one small chunk per 30 frames
#[derive(Clone)]
pub struct RecordingEncoder {
    pub recorded: Arc<Mutex<Recorded>>,
    pub accepts: Vec<VideoCodec>,
    pub fail_push_at: Option<usize>,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            accepts: vec![VideoCodec::H264High, VideoCodec::H264Main, VideoCodec::H264Baseline],
            fail_push_at: None,
        }
    }

    pub fn accepting(codecs: &[VideoCodec]) -> Self {
        Self {
            accepts: codecs.to_vec(),
            ..Self::new()
        }
    }
}

impl Encoder for RecordingEncoder {
    fn create_sink(
        &self,
        format: &OutputFormat,
        layout: &StreamLayout,
    ) -> Result<Box<dyn EncoderSink>, EncodeError> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.attempted.push(format.codec);
        if !self.accepts.contains(&format.codec) {
            return Err(EncodeError::Unsupported {
                format: format.mime(),
                reason: "codec not available".to_string(),
            });
        }
        recorded.layouts.push(layout.clone());
        Ok(Box::new(RecordingSink {
            recorded: self.recorded.clone(),
            fail_push_at: self.fail_push_at,
            pushed: 0,
            pending: Vec::new(),
        }))
    }
}

pub struct RecordingSink {
    recorded: Arc<Mutex<Recorded>>,
    fail_push_at: Option<usize>,
    pushed: usize,
    pending: Vec<Bytes>,
}

impl EncoderSink for RecordingSink {
    fn push_video(&mut self, image: &RgbaImage, pts: f64) -> Result<(), EncodeError> {
        if Some(self.pushed) == self.fail_push_at {
            return Err(EncodeError::Encode("encoder crashed".to_string()));
        }
        self.pushed += 1;
        self.recorded.lock().unwrap().frames.push((image.clone(), pts));
        if self.pushed % 30 == 0 {
            self.pending.push(Bytes::from(vec![b'v'; 4]));
        }
        Ok(())
    }

    fn push_audio(&mut self, _packet: &AudioPacket) -> Result<(), EncodeError> {
        self.recorded.lock().unwrap().audio += 1;
        Ok(())
    }

    fn take_chunks(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.pending)
    }

    fn finish(self: Box<Self>) -> Result<Vec<Bytes>, EncodeError> {
        self.recorded.lock().unwrap().finished = true;
        Ok(vec![Bytes::from_static(b"END")])
    }

    fn abort(self: Box<Self>) {
        self.recorded.lock().unwrap().aborted = true;
    }
}

/// Encode `frames` uniform frames into an MP4 file with the native encoder
pub fn write_clip(path: &Path, width: u32, height: u32, frames: u32, frame_rate: f64, shade: u8) {
    let format = OutputFormat::new(VideoCodec::H264Baseline, 2_000_000);
    let layout = StreamLayout {
        width,
        height,
        frame_rate,
        audio: None,
    };
    let mut sink = Mp4Encoder::new().create_sink(&format, &layout).unwrap();
    let image = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
    for index in 0..frames {
        sink.push_video(&image, index as f64 / frame_rate).unwrap();
    }
    let bytes: Vec<u8> = sink.finish().unwrap().concat();
    std::fs::write(path, bytes).unwrap();
}
