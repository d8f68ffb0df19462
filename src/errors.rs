use std::fmt;
use std::io;
use thiserror::Error;

/// Enumeration of all errors surfaced by an export job or the crate's entry points
#[derive(Debug, Error)]
pub enum SubburnError {
    /// Media metadata could not be resolved
    #[error("Source unreadable: {0}")]
    SourceUnreadable(String),

    /// No output format could be configured on the host encoder
    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// The real-time frame loop failed mid-stream
    #[error("Playback failure: {0}")]
    PlaybackFailure(String),

    /// The compositing surface could not be created
    #[error("Canvas unsupported: {0}")]
    CanvasUnsupported(String),

    /// The job was cancelled through its handle
    #[error("Export cancelled")]
    Cancelled,

    /// `run` was called on a job that already left `Idle`
    #[error("Export job already ran; start a new job")]
    JobConsumed,

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Discriminant of [`SubburnError`] for callers that branch on the failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportErrorKind {
    SourceUnreadable,
    EncoderUnavailable,
    PlaybackFailure,
    CanvasUnsupported,
    Cancelled,
    JobConsumed,
    Config,
    Io,
}

impl SubburnError {
    pub fn kind(&self) -> ExportErrorKind {
        match self {
            SubburnError::SourceUnreadable(_) => ExportErrorKind::SourceUnreadable,
            SubburnError::EncoderUnavailable(_) => ExportErrorKind::EncoderUnavailable,
            SubburnError::PlaybackFailure(_) => ExportErrorKind::PlaybackFailure,
            SubburnError::CanvasUnsupported(_) => ExportErrorKind::CanvasUnsupported,
            SubburnError::Cancelled => ExportErrorKind::Cancelled,
            SubburnError::JobConsumed => ExportErrorKind::JobConsumed,
            SubburnError::Config(_) => ExportErrorKind::Config,
            SubburnError::Io(_) => ExportErrorKind::Io,
        }
    }
}

impl fmt::Display for ExportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportErrorKind::SourceUnreadable => "SourceUnreadable",
            ExportErrorKind::EncoderUnavailable => "EncoderUnavailable",
            ExportErrorKind::PlaybackFailure => "PlaybackFailure",
            ExportErrorKind::CanvasUnsupported => "CanvasUnsupported",
            ExportErrorKind::Cancelled => "Cancelled",
            ExportErrorKind::JobConsumed => "JobConsumed",
            ExportErrorKind::Config => "Config",
            ExportErrorKind::Io => "Io",
        };
        f.write_str(name)
    }
}

/// Timecode decoding errors. Recovered by the caption parser, never surfaced by a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimecodeError {
    #[error("malformed timecode: {0:?}")]
    Malformed(String),
}

/// Errors reported by a [`crate::media::MediaSource`] or [`crate::media::AudioTap`]
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open media: {0}")]
    Open(String),

    #[error("missing {0} track")]
    MissingTrack(&'static str),

    #[error("invalid media metadata: {0}")]
    Metadata(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("source is not loaded")]
    NotLoaded,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors reported by a [`crate::export::Encoder`] or [`crate::export::EncoderSink`]
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The requested output format is not supported by this encoder
    #[error("unsupported output format {format}: {reason}")]
    Unsupported { format: String, reason: String },

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("muxing failed: {0}")]
    Mux(String),
}

/// Errors reported by a [`crate::compositor::SurfaceProvider`]
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("invalid surface dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("no caption font available")]
    FontMissing,

    #[error("font could not be loaded: {0}")]
    Font(String),
}

impl From<SurfaceError> for SubburnError {
    fn from(err: SurfaceError) -> Self {
        SubburnError::CanvasUnsupported(err.to_string())
    }
}

impl From<toml::de::Error> for SubburnError {
    fn from(err: toml::de::Error) -> Self {
        SubburnError::Config(err.to_string())
    }
}

// Conversion to io::Error for callers that only speak io
impl From<SubburnError> for io::Error {
    fn from(err: SubburnError) -> Self {
        match err {
            SubburnError::Io(inner) => inner,
            other => io::Error::other(other),
        }
    }
}

// Type alias for Result with SubburnError
pub type SubburnResult<T> = Result<T, SubburnError>;
