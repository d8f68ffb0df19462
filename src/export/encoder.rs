use super::types::{OutputFormat, StreamLayout};
use crate::errors::{EncodeError, SubburnError, SubburnResult};
use crate::media::AudioPacket;
use bytes::Bytes;
use image::RgbaImage;
use log::{debug, info, warn};

/// Creates encoder sinks for a given output format
#[cfg_attr(test, mockall::automock)]
pub trait Encoder {
    /// Fails with [`EncodeError::Unsupported`] when this encoder cannot produce `format`
    fn create_sink(
        &self,
        format: &OutputFormat,
        layout: &StreamLayout,
    ) -> Result<Box<dyn EncoderSink>, EncodeError>;
}

/// Receives the composited video track and the passthrough audio track
pub trait EncoderSink {
    /// `pts` is the playback position in seconds
    fn push_video(&mut self, image: &RgbaImage, pts: f64) -> Result<(), EncodeError>;

    fn push_audio(&mut self, packet: &AudioPacket) -> Result<(), EncodeError>;

    /// Output produced since the last call
    fn take_chunks(&mut self) -> Vec<Bytes>;

    /// Flush buffered output and return the remaining chunks
    fn finish(self: Box<Self>) -> Result<Vec<Bytes>, EncodeError>;

    /// Stop without producing output
    fn abort(self: Box<Self>);
}

/// Try each format in order and return the first sink the encoder accepts
pub fn negotiate_sink(
    encoder: &dyn Encoder,
    formats: &[OutputFormat],
    layout: &StreamLayout,
) -> SubburnResult<(OutputFormat, Box<dyn EncoderSink>)> {
    let mut attempts = Vec::with_capacity(formats.len());

    for format in formats {
        debug!("Trying output format {}", format);
        match encoder.create_sink(format, layout) {
            Ok(sink) => {
                info!("Negotiated output format {}", format);
                return Ok((*format, sink));
            }
            Err(e) => {
                warn!("Output format {} rejected: {}", format, e);
                attempts.push(format!("{} ({})", format.mime(), e));
            }
        }
    }

    if attempts.is_empty() {
        return Err(SubburnError::EncoderUnavailable(
            "no output formats configured".to_string(),
        ));
    }
    Err(SubburnError::EncoderUnavailable(format!(
        "every output format failed: {}",
        attempts.join("; ")
    )))
}
