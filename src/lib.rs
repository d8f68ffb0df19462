pub mod avc;
pub use avc::NaluType;

pub mod subtitles;
pub use subtitles::{
    active_entry, format_timecode, parse_caption_track, parse_timecode, serialize_caption_track,
    CaptionEntry, CaptionTrack, TimelineCursor,
};

pub mod compositor;
pub use compositor::{composite, RasterSurfaceProvider, Surface, SurfaceProvider};

pub mod media;
pub use media::{Clock, MediaInfo, MediaSource, Mp4Source, PlaybackClock};

pub mod export;
pub use export::{
    CancelHandle, Encoder, EncoderSink, ExportArtifact, ExportJob, ExportObserver, ExportPipeline,
    ExportState, Mp4Encoder, OutputFormat, VideoCodec,
};

pub mod config;
pub use config::ExportConfig;

pub mod errors;
pub use errors::{ExportErrorKind, SubburnError, SubburnResult};

use std::path::Path;
use std::sync::Arc;

/// Read and parse a caption file
pub fn load_caption_track<P: AsRef<Path>>(path: P) -> SubburnResult<CaptionTrack> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_caption_track(&text))
}

/// Burn `track` into the MP4 at `video_path` with the native backends.
///
/// Runs in real time: the call takes about as long as the video plays.
pub async fn burn_captions<P: AsRef<Path>>(
    video_path: P,
    track: CaptionTrack,
    config: ExportConfig,
    observer: &mut dyn ExportObserver,
) -> SubburnResult<ExportArtifact> {
    let surfaces = match &config.font_path {
        Some(path) => RasterSurfaceProvider::from_font_file(path)?,
        None => match compositor::discover_system_font() {
            Some(path) => RasterSurfaceProvider::from_font_file(path)?,
            None => RasterSurfaceProvider::default(),
        },
    };

    let clock = Arc::new(PlaybackClock::new());
    let mut pipeline = ExportPipeline::builder()
        .source(Mp4Source::new(video_path, clock.clone()))
        .clock(clock)
        .surfaces(surfaces)
        .encoder(Mp4Encoder::new())
        .captions(track)
        .config(config)
        .build()?;
    pipeline.run(observer).await
}

/// Output file name for a burned export: `<stem>_subtitled.<ext>`
pub fn subtitled_file_name(video_path: &Path, format: &OutputFormat) -> String {
    let stem = video_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    format!("{}_subtitled.{}", stem, format.extension())
}

/// File name the raw caption text is saved under: `<stem>.srt`
pub fn caption_file_name(video_path: &Path) -> String {
    let stem = video_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "captions".to_string());
    format!("{}.srt", stem)
}
