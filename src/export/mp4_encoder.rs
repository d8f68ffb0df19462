use super::encoder::{Encoder, EncoderSink};
use super::types::{OutputFormat, StreamLayout, VideoCodec};
use crate::avc::{annexb_to_access_unit, AccessUnit};
use crate::errors::EncodeError;
use crate::media::{AudioCodecConfig, AudioPacket, AudioTrackInfo};
use bytes::Bytes;
use image::RgbaImage;
use log::{debug, info, warn};
use mp4::{
    AacConfig, AudioObjectType, AvcConfig, ChannelConfig, FourCC, MediaConfig, Mp4Config,
    Mp4Sample, Mp4Writer, SampleFreqIndex, TrackConfig, TrackType,
};
use openh264::encoder::{BitRate, Encoder as H264Encoder, EncoderConfig, FrameRate, Profile};
use openh264::formats::{RgbSliceU8, YUVBuffer};
use openh264::OpenH264API;
use std::io::Cursor;

/// Millisecond timescale for the video track and the movie header
const VIDEO_TIMESCALE: u32 = 1000;

/// Native encoder: OpenH264 video plus passthrough AAC, muxed into MP4 in memory
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp4Encoder;

impl Mp4Encoder {
    pub fn new() -> Self {
        Self
    }
}

fn unsupported(format: &OutputFormat, reason: impl Into<String>) -> EncodeError {
    EncodeError::Unsupported {
        format: format.mime(),
        reason: reason.into(),
    }
}

fn profile_for(codec: VideoCodec) -> Profile {
    match codec {
        VideoCodec::H264High => Profile::High,
        VideoCodec::H264Main => Profile::Main,
        VideoCodec::H264Baseline => Profile::Baseline,
    }
}

impl Encoder for Mp4Encoder {
    fn create_sink(
        &self,
        format: &OutputFormat,
        layout: &StreamLayout,
    ) -> Result<Box<dyn EncoderSink>, EncodeError> {
        if format.bitrate_bps == 0 {
            return Err(unsupported(format, "bitrate must be positive"));
        }
        // 4:2:0 chroma needs even dimensions, odd edges are cropped
        let width = layout.width & !1;
        let height = layout.height & !1;
        if width < 2 || height < 2 || width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(unsupported(
                format,
                format!("cannot encode {}x{}", layout.width, layout.height),
            ));
        }
        let frame_rate = if layout.frame_rate.is_finite() && layout.frame_rate > 0.0 {
            layout.frame_rate
        } else {
            30.0
        };

        let config = EncoderConfig::new()
            .bitrate(BitRate::from_bps(format.bitrate_bps))
            .max_frame_rate(FrameRate::from_hz(frame_rate as f32))
            .profile(profile_for(format.codec));
        let encoder = H264Encoder::with_api_config(OpenH264API::from_source(), config)
            .map_err(|e| unsupported(format, e.to_string()))?;

        let mp4_config = Mp4Config {
            major_brand: fourcc("isom")?,
            minor_version: 512,
            compatible_brands: vec![fourcc("isom")?, fourcc("iso2")?, fourcc("avc1")?, fourcc("mp41")?],
            timescale: VIDEO_TIMESCALE,
        };
        let writer = Mp4Writer::write_start(Cursor::new(Vec::new()), &mp4_config)
            .map_err(|e| EncodeError::Mux(e.to_string()))?;

        debug!("Created MP4 sink {}x{} for {}", width, height, format);
        Ok(Box::new(Mp4EncoderSink {
            encoder,
            writer,
            width,
            height,
            frame_interval_ms: ((1000.0 / frame_rate).round() as u32).max(1),
            audio: layout.audio.clone(),
            next_track_id: 1,
            video_track: None,
            audio_track: None,
            pending_video: None,
            pending_audio: Vec::new(),
            rgb: Vec::with_capacity(width as usize * height as usize * 3),
            frames_written: 0,
            audio_written: 0,
        }))
    }
}

fn fourcc(value: &str) -> Result<FourCC, EncodeError> {
    value
        .parse::<FourCC>()
        .map_err(|e| EncodeError::Mux(format!("bad brand {}: {}", value, e)))
}

fn aac_track_config(info: &AudioTrackInfo) -> Result<TrackConfig, EncodeError> {
    let AudioCodecConfig::Aac {
        object_type,
        freq_index,
        channel_config,
    } = info.codec;
    let mux = |e: mp4::Error| EncodeError::Mux(format!("unsupported AAC config: {}", e));
    Ok(TrackConfig {
        track_type: TrackType::Audio,
        timescale: info.timescale,
        language: "und".to_string(),
        media_conf: MediaConfig::AacConfig(AacConfig {
            bitrate: info.bitrate,
            profile: AudioObjectType::try_from(object_type).map_err(mux)?,
            freq_index: SampleFreqIndex::try_from(freq_index).map_err(mux)?,
            chan_conf: ChannelConfig::try_from(channel_config).map_err(mux)?,
        }),
    })
}

/// Encoded picture waiting for the next timestamp to learn its duration
struct PendingVideo {
    unit: AccessUnit,
    pts_ms: u64,
}

pub struct Mp4EncoderSink {
    encoder: H264Encoder,
    writer: Mp4Writer<Cursor<Vec<u8>>>,
    width: u32,
    height: u32,
    frame_interval_ms: u32,
    audio: Option<AudioTrackInfo>,
    next_track_id: u32,
    video_track: Option<u32>,
    audio_track: Option<u32>,
    pending_video: Option<PendingVideo>,
    pending_audio: Vec<AudioPacket>,
    rgb: Vec<u8>,
    frames_written: u64,
    audio_written: u64,
}

impl Mp4EncoderSink {
    /// Copy the RGB channels, cropping to the encoded size
    fn fill_rgb(&mut self, image: &RgbaImage) -> Result<(), EncodeError> {
        let (src_width, src_height) = image.dimensions();
        if src_width < self.width || src_height < self.height {
            return Err(EncodeError::Encode(format!(
                "frame {}x{} smaller than stream {}x{}",
                src_width, src_height, self.width, self.height
            )));
        }
        self.rgb.clear();
        let raw = image.as_raw();
        for y in 0..self.height as usize {
            let row = y * src_width as usize * 4;
            for x in 0..self.width as usize {
                let offset = row + x * 4;
                self.rgb.extend_from_slice(&raw[offset..offset + 3]);
            }
        }
        Ok(())
    }

    fn add_track(&mut self, config: &TrackConfig) -> Result<u32, EncodeError> {
        self.writer
            .add_track(config)
            .map_err(|e| EncodeError::Mux(e.to_string()))?;
        let id = self.next_track_id;
        self.next_track_id += 1;
        Ok(id)
    }

    /// The video track needs SPS/PPS, which only exist after the first encode
    fn ensure_video_track(&mut self, unit: &AccessUnit) -> Result<Option<u32>, EncodeError> {
        if self.video_track.is_some() {
            return Ok(self.video_track);
        }
        let (Some(sps), Some(pps)) = (unit.sps.clone(), unit.pps.clone()) else {
            return Ok(None);
        };
        let config = TrackConfig {
            track_type: TrackType::Video,
            timescale: VIDEO_TIMESCALE,
            language: "und".to_string(),
            media_conf: MediaConfig::AvcConfig(AvcConfig {
                width: self.width as u16,
                height: self.height as u16,
                seq_param_set: sps,
                pic_param_set: pps,
            }),
        };
        let id = self.add_track(&config)?;
        info!("Added {}x{} H.264 track {}", self.width, self.height, id);
        self.video_track = Some(id);
        Ok(self.video_track)
    }

    fn write_video(&mut self, pending: PendingVideo, duration_ms: u32) -> Result<(), EncodeError> {
        let Some(track_id) = self.video_track else {
            return Ok(());
        };
        let sample = Mp4Sample {
            start_time: pending.pts_ms,
            duration: duration_ms.max(1),
            rendering_offset: 0,
            is_sync: pending.unit.is_sync,
            bytes: Bytes::from(pending.unit.sample),
        };
        self.writer
            .write_sample(track_id, &sample)
            .map_err(|e| EncodeError::Mux(e.to_string()))?;
        self.frames_written += 1;
        Ok(())
    }

    fn write_audio(&mut self, track_id: u32, packet: &AudioPacket) -> Result<(), EncodeError> {
        let sample = Mp4Sample {
            start_time: packet.start_time,
            duration: packet.duration,
            rendering_offset: 0,
            is_sync: packet.is_sync,
            bytes: packet.bytes.clone(),
        };
        self.writer
            .write_sample(track_id, &sample)
            .map_err(|e| EncodeError::Mux(e.to_string()))?;
        self.audio_written += 1;
        Ok(())
    }

    /// Audio is held back until the video track exists so it lands second
    fn flush_audio(&mut self) -> Result<(), EncodeError> {
        if self.video_track.is_none() || self.pending_audio.is_empty() {
            return Ok(());
        }
        let track_id = match self.audio_track {
            Some(id) => id,
            None => {
                let Some(info) = self.audio.clone() else {
                    warn!("Dropping {} audio packets without track info", self.pending_audio.len());
                    self.pending_audio.clear();
                    return Ok(());
                };
                let id = self.add_track(&aac_track_config(&info)?)?;
                debug!("Added AAC track {}", id);
                self.audio_track = Some(id);
                id
            }
        };
        for packet in std::mem::take(&mut self.pending_audio) {
            self.write_audio(track_id, &packet)?;
        }
        Ok(())
    }
}

impl EncoderSink for Mp4EncoderSink {
    fn push_video(&mut self, image: &RgbaImage, pts: f64) -> Result<(), EncodeError> {
        self.fill_rgb(image)?;
        let yuv = YUVBuffer::from_rgb_source(RgbSliceU8::new(
            &self.rgb,
            (self.width as usize, self.height as usize),
        ));
        let bitstream = self
            .encoder
            .encode(&yuv)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;
        let unit = annexb_to_access_unit(&bitstream.to_vec());
        if unit.sample.is_empty() {
            // Rate control skipped this frame
            return Ok(());
        }
        if self.ensure_video_track(&unit)?.is_none() {
            return Err(EncodeError::Encode(
                "first encoded frame carried no parameter sets".to_string(),
            ));
        }

        let mut pts_ms = (pts.max(0.0) * 1000.0).round() as u64;
        if let Some(previous) = self.pending_video.take() {
            if pts_ms <= previous.pts_ms {
                pts_ms = previous.pts_ms + 1;
            }
            let duration = (pts_ms - previous.pts_ms).min(u32::MAX as u64) as u32;
            self.write_video(previous, duration)?;
        }
        self.pending_video = Some(PendingVideo { unit, pts_ms });
        self.flush_audio()
    }

    fn push_audio(&mut self, packet: &AudioPacket) -> Result<(), EncodeError> {
        self.pending_audio.push(packet.clone());
        self.flush_audio()
    }

    fn take_chunks(&mut self) -> Vec<Bytes> {
        // The moov box is only known at the end, so all output comes from `finish`
        Vec::new()
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<Bytes>, EncodeError> {
        if let Some(last) = self.pending_video.take() {
            let interval = self.frame_interval_ms;
            self.write_video(last, interval)?;
        }
        if self.video_track.is_none() {
            return Err(EncodeError::Mux("no video frames were encoded".to_string()));
        }
        self.flush_audio()?;
        self.writer
            .write_end()
            .map_err(|e| EncodeError::Mux(e.to_string()))?;

        info!(
            "Finished MP4: {} video samples, {} audio samples",
            self.frames_written, self.audio_written
        );
        let data = self.writer.into_writer().into_inner();
        Ok(vec![Bytes::from(data)])
    }

    fn abort(self: Box<Self>) {
        debug!(
            "Aborted MP4 sink after {} video samples",
            self.frames_written
        );
    }
}
