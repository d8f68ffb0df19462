use super::encoder::{negotiate_sink, Encoder, EncoderSink};
use super::progress::ProgressTracker;
use super::types::{
    CancelHandle, ExportArtifact, ExportJob, ExportObserver, ExportState, StreamLayout,
};
use crate::compositor::{composite, Surface, SurfaceProvider};
use crate::config::ExportConfig;
use crate::errors::{EncodeError, SubburnError, SubburnResult};
use crate::media::{AudioMonitor, AudioPacket, AudioTap, Clock, MediaInfo, MediaSource};
use crate::subtitles::{CaptionTrack, TimelineCursor};
use bytes::{Bytes, BytesMut};
use image::RgbaImage;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Work items for the single owner of the encoder sink
enum SinkInput {
    Video { image: RgbaImage, pts: f64 },
    Audio(AudioPacket),
}

struct VideoStats {
    frames: u64,
    last_position: f64,
    max_lag: f64,
}

struct MuxOutcome {
    sink: Box<dyn EncoderSink>,
    chunks: Vec<Bytes>,
    error: Option<EncodeError>,
}

/// Everything the per-frame loop reads or updates
struct FrameLoop<'a> {
    source: &'a mut dyn MediaSource,
    surface: &'a mut dyn Surface,
    track: &'a CaptionTrack,
    clock: &'a dyn Clock,
    frame_interval: f64,
    cancel: &'a CancelHandle,
    abort: &'a CancelHandle,
    job: &'a mut ExportJob,
    progress: &'a mut ProgressTracker,
    observer: &'a mut dyn ExportObserver,
}

impl FrameLoop<'_> {
    /// One iteration per displayed source frame until playback ends.
    ///
    /// The playback position is the media timestamp of the frame being drawn.
    /// It picks the caption and stamps the encoded frame, so output timing
    /// follows the source even when compositing falls behind the clock.
    async fn run(&mut self, frames_tx: mpsc::Sender<SinkInput>) -> SubburnResult<VideoStats> {
        let mut cursor = TimelineCursor::new();
        let mut stats = VideoStats {
            frames: 0,
            last_position: 0.0,
            max_lag: 0.0,
        };

        loop {
            if self.cancel.is_cancelled() {
                info!("Export cancelled after {} frames", stats.frames);
                return Err(SubburnError::Cancelled);
            }
            if self.abort.is_cancelled() {
                return Err(SubburnError::PlaybackFailure("recording aborted".to_string()));
            }

            let frame = match self.source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => return Err(SubburnError::PlaybackFailure(e.to_string())),
            };

            let position = frame.pts.max(stats.last_position);
            let lag = self.clock.position() - position;
            if lag > self.frame_interval && stats.max_lag <= self.frame_interval {
                warn!("Export running {:.3}s behind playback at {:.3}s", lag, position);
            }
            stats.max_lag = stats.max_lag.max(lag);

            let text = cursor.active(self.track, position).map(|entry| entry.text.as_str());
            let image = composite(self.surface, &frame.image, text);

            frames_tx
                .send(SinkInput::Video { image, pts: position })
                .await
                .map_err(|_| SubburnError::PlaybackFailure("encoder sink closed".to_string()))?;

            stats.frames += 1;
            stats.last_position = position;

            let percent = self.progress.update(position);
            self.job.set_progress(percent);
            self.observer.on_progress(percent);
        }

        debug!(
            "Source ended after {} frames, worst lag {:.3}s",
            stats.frames, stats.max_lag
        );
        Ok(stats)
    }
}

/// Read the audio tap once and fan it out: encoder sink first, monitor second
async fn pump_audio(
    tap: Option<Box<dyn AudioTap>>,
    mut monitor: Option<&mut (dyn AudioMonitor + 'static)>,
    audio_tx: mpsc::Sender<SinkInput>,
    stop: &CancelHandle,
) -> SubburnResult<u64> {
    let Some(mut tap) = tap else {
        return Ok(0);
    };
    let mut packets = 0u64;

    loop {
        let next = tokio::select! {
            _ = stop.cancelled() => break,
            next = tap.next_packet() => next,
        };
        let packet = match next {
            Ok(Some(packet)) => packet,
            Ok(None) => break,
            Err(e) => return Err(SubburnError::PlaybackFailure(format!("audio: {}", e))),
        };

        if let Some(monitor) = monitor.as_deref_mut() {
            monitor.play(&packet);
        }
        if audio_tx.send(SinkInput::Audio(packet)).await.is_err() {
            break;
        }
        packets += 1;
    }

    debug!("Audio tap delivered {} packets", packets);
    Ok(packets)
}

/// Sole owner of the sink while recording
async fn mux(mut sink: Box<dyn EncoderSink>, mut inputs: mpsc::Receiver<SinkInput>) -> MuxOutcome {
    let mut chunks = Vec::new();
    let mut error = None;

    while let Some(input) = inputs.recv().await {
        let pushed = match &input {
            SinkInput::Video { image, pts } => sink.push_video(image, *pts),
            SinkInput::Audio(packet) => sink.push_audio(packet),
        };
        if let Err(e) = pushed {
            error = Some(e);
            break;
        }
        chunks.extend(sink.take_chunks());
    }

    MuxOutcome { sink, chunks, error }
}

/// Drives one [`ExportJob`] from `Idle` to `Succeeded` or `Failed`
pub struct ExportPipeline {
    source: Box<dyn MediaSource>,
    clock: Arc<dyn Clock>,
    surfaces: Box<dyn SurfaceProvider>,
    encoder: Box<dyn Encoder>,
    track: CaptionTrack,
    config: ExportConfig,
    monitor: Option<Box<dyn AudioMonitor>>,
    cancel: CancelHandle,
    job: ExportJob,
}

impl ExportPipeline {
    pub fn builder() -> ExportPipelineBuilder {
        ExportPipelineBuilder::default()
    }

    pub fn job(&self) -> &ExportJob {
        &self.job
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn transition(&mut self, next: ExportState, observer: &mut dyn ExportObserver) {
        self.job.transition(next);
        observer.on_state(next);
    }

    /// Run the job to completion. A job runs once; later calls fail with
    /// [`SubburnError::JobConsumed`].
    pub async fn run(&mut self, observer: &mut dyn ExportObserver) -> SubburnResult<ExportArtifact> {
        if self.job.state() != ExportState::Idle {
            return Err(SubburnError::JobConsumed);
        }
        self.transition(ExportState::Preparing, observer);

        let result = self.execute(observer).await;
        // Released on success and on every failure path
        self.source.release();

        match result {
            Ok(artifact) => {
                self.transition(ExportState::Succeeded, observer);
                info!(
                    "Export succeeded: {} bytes, {} frames, {:.3}s as {}",
                    artifact.bytes.len(),
                    artifact.frame_count,
                    artifact.duration,
                    artifact.format
                );
                Ok(artifact)
            }
            Err(e) => {
                warn!("Export failed ({}): {}", e.kind(), e);
                self.job.fail(e.kind());
                observer.on_state(ExportState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, observer: &mut dyn ExportObserver) -> SubburnResult<ExportArtifact> {
        let info = self
            .source
            .load()
            .await
            .map_err(|e| SubburnError::SourceUnreadable(e.to_string()))?;
        if !(info.duration.is_finite() && info.duration > 0.0) {
            return Err(SubburnError::SourceUnreadable(format!(
                "invalid duration {}",
                info.duration
            )));
        }

        let mut surface = self.surfaces.create_surface(info.width, info.height)?;
        let layout = self.stream_layout(&info);
        let (format, sink) =
            negotiate_sink(self.encoder.as_ref(), &self.config.output_formats(), &layout)?;

        self.transition(ExportState::Recording, observer);
        let tap = match self.source.start().await {
            Ok(tap) => tap,
            Err(e) => {
                sink.abort();
                return Err(SubburnError::PlaybackFailure(e.to_string()));
            }
        };
        if tap.is_none() {
            warn!("Source has no audio output, recording video only");
        }

        let (outcome, video, audio) = self
            .record(surface.as_mut(), sink, tap, &info, frame_interval(&layout), observer)
            .await;

        if let Some(e) = outcome.error {
            outcome.sink.abort();
            return Err(SubburnError::PlaybackFailure(e.to_string()));
        }
        let stats = match (video, audio) {
            (Err(e), _) | (Ok(_), Err(e)) => {
                outcome.sink.abort();
                return Err(e);
            }
            (Ok(stats), Ok(_)) => stats,
        };
        if stats.frames == 0 {
            outcome.sink.abort();
            return Err(SubburnError::PlaybackFailure(
                "source produced no frames".to_string(),
            ));
        }

        self.transition(ExportState::Finalizing, observer);
        let mut chunks = outcome.chunks;
        let tail = outcome
            .sink
            .finish()
            .map_err(|e| SubburnError::PlaybackFailure(e.to_string()))?;
        chunks.extend(tail);
        self.job.set_chunk_count(chunks.len());

        let mut bytes = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            bytes.extend_from_slice(chunk);
        }

        let mut progress = ProgressTracker::new(info.duration);
        progress.update(stats.last_position);
        let percent = progress.finish();
        self.job.set_progress(percent);
        observer.on_progress(percent);

        Ok(ExportArtifact {
            bytes: bytes.freeze(),
            format,
            duration: stats.last_position + frame_interval(&layout),
            frame_count: stats.frames,
        })
    }

    /// Video, audio and mux run concurrently until the source ends or fails
    async fn record(
        &mut self,
        surface: &mut dyn Surface,
        sink: Box<dyn EncoderSink>,
        tap: Option<Box<dyn AudioTap>>,
        info: &MediaInfo,
        frame_interval: f64,
        observer: &mut dyn ExportObserver,
    ) -> (MuxOutcome, SubburnResult<VideoStats>, SubburnResult<u64>) {
        let (frames_tx, inputs) = mpsc::channel(self.config.frame_queue_depth);
        let audio_tx = frames_tx.clone();
        let stop_audio = CancelHandle::new();
        let abort_video = CancelHandle::new();
        let mut progress = ProgressTracker::new(info.duration);

        let monitor = if self.config.monitor_audio {
            self.monitor.as_deref_mut()
        } else {
            None
        };

        let mut frame_loop = FrameLoop {
            source: self.source.as_mut(),
            surface,
            track: &self.track,
            clock: self.clock.as_ref(),
            frame_interval,
            cancel: &self.cancel,
            abort: &abort_video,
            job: &mut self.job,
            progress: &mut progress,
            observer,
        };

        let video = async {
            let result = frame_loop.run(frames_tx).await;
            stop_audio.cancel();
            result
        };
        let audio = async {
            let result = pump_audio(tap, monitor, audio_tx, &stop_audio).await;
            if result.is_err() {
                abort_video.cancel();
            }
            result
        };

        let (video, audio, outcome) = tokio::join!(video, audio, mux(sink, inputs));
        (outcome, video, audio)
    }

    fn stream_layout(&self, info: &MediaInfo) -> StreamLayout {
        let frame_rate = if info.frame_rate.is_finite() && info.frame_rate > 0.0 {
            info.frame_rate.min(self.config.max_frame_rate)
        } else {
            self.config.max_frame_rate
        };
        StreamLayout {
            width: info.width,
            height: info.height,
            frame_rate,
            audio: info.audio.clone(),
        }
    }
}

fn frame_interval(layout: &StreamLayout) -> f64 {
    if layout.frame_rate > 0.0 {
        1.0 / layout.frame_rate
    } else {
        0.0
    }
}

/// Collects the capabilities an [`ExportPipeline`] runs against
#[derive(Default)]
pub struct ExportPipelineBuilder {
    source: Option<Box<dyn MediaSource>>,
    clock: Option<Arc<dyn Clock>>,
    surfaces: Option<Box<dyn SurfaceProvider>>,
    encoder: Option<Box<dyn Encoder>>,
    track: CaptionTrack,
    config: ExportConfig,
    monitor: Option<Box<dyn AudioMonitor>>,
    cancel: Option<CancelHandle>,
}

impl ExportPipelineBuilder {
    pub fn source(mut self, source: impl MediaSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn surfaces(mut self, surfaces: impl SurfaceProvider + 'static) -> Self {
        self.surfaces = Some(Box::new(surfaces));
        self
    }

    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    pub fn captions(mut self, track: CaptionTrack) -> Self {
        self.track = track;
        self
    }

    pub fn config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn monitor(mut self, monitor: impl AudioMonitor + 'static) -> Self {
        self.monitor = Some(Box::new(monitor));
        self
    }

    pub fn cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> SubburnResult<ExportPipeline> {
        self.config.validate()?;
        let missing = |name: &str| SubburnError::Config(format!("export pipeline needs a {}", name));
        Ok(ExportPipeline {
            source: self.source.ok_or_else(|| missing("media source"))?,
            clock: self.clock.ok_or_else(|| missing("clock"))?,
            surfaces: self.surfaces.ok_or_else(|| missing("surface provider"))?,
            encoder: self.encoder.ok_or_else(|| missing("encoder"))?,
            track: self.track,
            config: self.config,
            monitor: self.monitor,
            cancel: self.cancel.unwrap_or_default(),
            job: ExportJob::new(),
        })
    }
}
