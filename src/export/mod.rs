mod encoder;
mod mp4_encoder;
mod pipeline;
mod progress;
mod types;

pub use encoder::{negotiate_sink, Encoder, EncoderSink};
pub use mp4_encoder::{Mp4Encoder, Mp4EncoderSink};
pub use pipeline::{ExportPipeline, ExportPipelineBuilder};
pub use progress::ProgressTracker;
pub use types::{
    CancelHandle, ExportArtifact, ExportJob, ExportObserver, ExportState, OutputFormat,
    StreamLayout, VideoCodec,
};

#[cfg(test)]
pub use encoder::MockEncoder;
