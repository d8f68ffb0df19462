use crate::errors::ExportErrorKind;
use crate::media::AudioTrackInfo;
use bytes::Bytes;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Lifecycle of one export job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportState {
    Idle,
    Preparing,
    Recording,
    Finalizing,
    Succeeded,
    Failed,
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Succeeded | ExportState::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: ExportState) -> bool {
        use ExportState::*;
        matches!(
            (self, next),
            (Idle, Preparing)
                | (Preparing, Recording)
                | (Preparing, Failed)
                | (Recording, Finalizing)
                | (Recording, Failed)
                | (Finalizing, Succeeded)
                | (Finalizing, Failed)
        )
    }
}

/// Observable record of a job: where it is, how far along, how it ended
#[derive(Debug, Clone)]
pub struct ExportJob {
    state: ExportState,
    progress: u8,
    chunk_count: usize,
    history: Vec<ExportState>,
    failure: Option<ExportErrorKind>,
}

impl Default for ExportJob {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportJob {
    pub fn new() -> Self {
        Self {
            state: ExportState::Idle,
            progress: 0,
            chunk_count: 0,
            history: vec![ExportState::Idle],
            failure: None,
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Encoder output chunks collected so far
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Every state the job has been in, oldest first
    pub fn history(&self) -> &[ExportState] {
        &self.history
    }

    pub fn failure(&self) -> Option<ExportErrorKind> {
        self.failure
    }

    pub(crate) fn transition(&mut self, next: ExportState) {
        if !self.state.can_transition_to(next) {
            warn!("Unexpected export transition {:?} -> {:?}", self.state, next);
        }
        info!("Export job: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    pub(crate) fn set_progress(&mut self, percent: u8) {
        self.progress = self.progress.max(percent.min(100));
    }

    pub(crate) fn set_chunk_count(&mut self, count: usize) {
        self.chunk_count = count;
    }

    pub(crate) fn fail(&mut self, kind: ExportErrorKind) {
        self.failure = Some(kind);
        self.transition(ExportState::Failed);
    }
}

/// H.264 profiles the MP4 sink can be asked for, most efficient first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    H264High,
    H264Main,
    H264Baseline,
}

impl VideoCodec {
    /// RFC 6381 codec string
    pub fn codecs_param(&self) -> &'static str {
        match self {
            VideoCodec::H264High => "avc1.640028",
            VideoCodec::H264Main => "avc1.4D401E",
            VideoCodec::H264Baseline => "avc1.42E01E",
        }
    }
}

/// A concrete container/codec/bitrate combination offered to an encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub codec: VideoCodec,
    pub bitrate_bps: u32,
}

impl OutputFormat {
    pub const CONTAINER: &'static str = "video/mp4";

    pub fn new(codec: VideoCodec, bitrate_bps: u32) -> Self {
        Self { codec, bitrate_bps }
    }

    pub fn mime(&self) -> String {
        format!("{};codecs={}", Self::CONTAINER, self.codec.codecs_param())
    }

    pub fn extension(&self) -> &'static str {
        "mp4"
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} bps", self.mime(), self.bitrate_bps)
    }
}

/// Shape of the combined stream handed to an encoder sink
#[derive(Debug, Clone, PartialEq)]
pub struct StreamLayout {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub audio: Option<AudioTrackInfo>,
}

/// Result of a successful export
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Bytes,
    pub format: OutputFormat,
    /// Seconds of video captured
    pub duration: f64,
    pub frame_count: u64,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation shared between a job and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancelHandle::cancel`] has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Read-only observer of a running job
pub trait ExportObserver {
    /// Integer percentage, non-decreasing within a job, last value 100 on success
    fn on_progress(&mut self, percent: u8);

    fn on_state(&mut self, _state: ExportState) {}
}

impl<F: FnMut(u8)> ExportObserver for F {
    fn on_progress(&mut self, percent: u8) {
        self(percent)
    }
}
