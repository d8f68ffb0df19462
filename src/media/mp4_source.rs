use super::clock::{Clock, PlaybackClock};
use super::source::{AudioTap, MediaSource};
use super::types::{AudioCodecConfig, AudioPacket, AudioTrackInfo, MediaInfo, VideoFrame};
use crate::avc::sample_to_annexb;
use crate::errors::SourceError;
use async_trait::async_trait;
use image::{DynamicImage, RgbImage, RgbaImage};
use log::{debug, info, warn};
use mp4::{MediaType, Mp4Reader, Mp4Track, TrackType};
use openh264::decoder::Decoder;
use openh264::formats::YUVSource;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

type FileReader = Mp4Reader<BufReader<File>>;

/// Plays an MP4 file: its first H.264 track decoded with OpenH264, its first
/// AAC track passed through as compressed packets, both paced by a wall clock
pub struct Mp4Source {
    path: PathBuf,
    clock: Arc<PlaybackClock>,
    loaded: Option<LoadedVideo>,
}

struct LoadedVideo {
    reader: FileReader,
    track_id: u32,
    timescale: u32,
    sample_count: u32,
    next_sample: u32,
    sps: Vec<u8>,
    pps: Vec<u8>,
    decoder: Option<Decoder>,
    info: MediaInfo,
    audio_track_id: Option<u32>,
}

impl Mp4Source {
    pub fn new<P: AsRef<Path>>(path: P, clock: Arc<PlaybackClock>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            clock,
            loaded: None,
        }
    }

    fn open_reader(&self) -> Result<FileReader, SourceError> {
        let file = File::open(&self.path)?;
        let size = file.metadata()?.len();
        Mp4Reader::read_header(BufReader::new(file), size)
            .map_err(|e| SourceError::Open(format!("{}: {}", self.path.display(), e)))
    }

    async fn wait_until(&self, position: f64) {
        let ahead = position - self.clock.position();
        if ahead > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(ahead)).await;
        }
    }
}

fn find_track(reader: &FileReader, media_type: MediaType) -> Option<&Mp4Track> {
    let mut tracks: Vec<&Mp4Track> = reader.tracks().values().collect();
    tracks.sort_by_key(|track| track.track_id());
    tracks
        .into_iter()
        .find(|track| track.media_type().map(|t| t == media_type).unwrap_or(false))
}

fn audio_track_info(track: &Mp4Track) -> Result<AudioTrackInfo, SourceError> {
    let metadata = |e: mp4::Error| SourceError::Metadata(e.to_string());
    Ok(AudioTrackInfo {
        timescale: track.timescale(),
        bitrate: track.bitrate(),
        codec: AudioCodecConfig::Aac {
            object_type: track.audio_profile().map_err(metadata)? as u8,
            freq_index: track.sample_freq_index().map_err(metadata)? as u8,
            channel_config: track.channel_config().map_err(metadata)? as u8,
        },
    })
}

/// Seconds between `start` and the end of the presentation, validated
fn media_duration(reader: &FileReader, video: &Mp4Track) -> Result<f64, SourceError> {
    let mut duration = reader.duration().as_secs_f64();
    if duration <= 0.0 {
        duration = video.duration().as_secs_f64();
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(SourceError::Metadata(format!(
            "duration must be positive and finite, got {}",
            duration
        )));
    }
    Ok(duration)
}

fn decode_to_rgba(decoder: &mut Decoder, annexb: &[u8]) -> Result<Option<RgbaImage>, SourceError> {
    match decoder.decode(annexb) {
        Ok(Some(yuv)) => {
            let (width, height) = yuv.dimensions();
            let mut rgb_data = vec![0u8; yuv.rgb8_len()];
            yuv.write_rgb8(&mut rgb_data);
            let rgb = RgbImage::from_raw(width as u32, height as u32, rgb_data)
                .ok_or_else(|| SourceError::Decode("decoded frame has an invalid size".into()))?;
            Ok(Some(DynamicImage::ImageRgb8(rgb).into_rgba8()))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(SourceError::Decode(e.to_string())),
    }
}

/// Feed SPS then PPS so later samples can be decoded without them
fn prime_decoder(decoder: &mut Decoder, sps: &[u8], pps: &[u8]) -> Result<(), SourceError> {
    for parameter_set in [sps, pps] {
        let mut data = vec![0, 0, 0, 1];
        data.extend_from_slice(parameter_set);
        decoder
            .decode(&data)
            .map_err(|e| SourceError::Decode(format!("parameter sets rejected: {}", e)))?;
    }
    Ok(())
}

#[async_trait(?Send)]
impl MediaSource for Mp4Source {
    async fn load(&mut self) -> Result<MediaInfo, SourceError> {
        let reader = self.open_reader()?;

        let video = find_track(&reader, MediaType::H264).ok_or(SourceError::MissingTrack("H.264 video"))?;
        if video.track_type().map_err(|e| SourceError::Metadata(e.to_string()))? != TrackType::Video {
            return Err(SourceError::MissingTrack("H.264 video"));
        }
        let duration = media_duration(&reader, video)?;
        let sps = video
            .sequence_parameter_set()
            .map_err(|e| SourceError::Metadata(e.to_string()))?
            .to_vec();
        let pps = video
            .picture_parameter_set()
            .map_err(|e| SourceError::Metadata(e.to_string()))?
            .to_vec();

        let audio = match find_track(&reader, MediaType::AAC) {
            Some(track) => match audio_track_info(track) {
                Ok(info) => Some((track.track_id(), info)),
                Err(e) => {
                    warn!("Ignoring unusable audio track {}: {}", track.track_id(), e);
                    None
                }
            },
            None => {
                warn!("{} has no AAC audio track, output will be silent", self.path.display());
                None
            }
        };

        let info = MediaInfo {
            width: video.width() as u32,
            height: video.height() as u32,
            duration,
            frame_rate: video.frame_rate(),
            audio: audio.as_ref().map(|(_, info)| info.clone()),
        };
        if info.width == 0 || info.height == 0 {
            return Err(SourceError::Metadata(format!(
                "invalid video dimensions {}x{}",
                info.width, info.height
            )));
        }

        info!(
            "Loaded {}: {}x{}, {:.3}s at {:.2} fps, audio={}",
            self.path.display(),
            info.width,
            info.height,
            info.duration,
            info.frame_rate,
            info.audio.is_some()
        );

        self.loaded = Some(LoadedVideo {
            track_id: video.track_id(),
            timescale: video.timescale(),
            sample_count: video.sample_count(),
            next_sample: 1,
            sps,
            pps,
            decoder: None,
            info: info.clone(),
            audio_track_id: audio.map(|(id, _)| id),
            reader,
        });
        Ok(info)
    }

    async fn start(&mut self) -> Result<Option<Box<dyn AudioTap>>, SourceError> {
        let audio_reader = match self.loaded.as_ref().and_then(|l| l.audio_track_id) {
            Some(track_id) => Some((self.open_reader()?, track_id)),
            None => None,
        };
        let loaded = self.loaded.as_mut().ok_or(SourceError::NotLoaded)?;

        let mut decoder =
            Decoder::new().map_err(|e| SourceError::Decode(format!("cannot create decoder: {}", e)))?;
        prime_decoder(&mut decoder, &loaded.sps, &loaded.pps)?;
        loaded.decoder = Some(decoder);
        loaded.next_sample = 1;

        self.clock.start();
        debug!("Playback started for {}", self.path.display());

        Ok(audio_reader.map(|(reader, track_id)| {
            Box::new(Mp4AudioTap::new(reader, track_id, self.clock.clone())) as Box<dyn AudioTap>
        }))
    }

    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        loop {
            let (frame, duration) = {
                let loaded = self.loaded.as_mut().ok_or(SourceError::NotLoaded)?;
                let duration = loaded.info.duration;
                if loaded.next_sample > loaded.sample_count {
                    (None, duration)
                } else {
                    let sample_id = loaded.next_sample;
                    loaded.next_sample += 1;
                    let sample = loaded
                        .reader
                        .read_sample(loaded.track_id, sample_id)
                        .map_err(|e| SourceError::Decode(format!("sample {}: {}", sample_id, e)))?;
                    let Some(sample) = sample else {
                        continue;
                    };

                    let Some(annexb) = sample_to_annexb(&sample.bytes) else {
                        warn!("Skipping malformed sample {}", sample_id);
                        continue;
                    };
                    let decoder = loaded.decoder.as_mut().ok_or(SourceError::NotLoaded)?;
                    let Some(image) = decode_to_rgba(decoder, &annexb)? else {
                        continue;
                    };

                    let presentation = sample.start_time as i64 + sample.rendering_offset as i64;
                    let pts = presentation.max(0) as f64 / loaded.timescale.max(1) as f64;
                    (Some(VideoFrame { image, pts }), duration)
                }
            };

            match frame {
                Some(frame) => {
                    self.wait_until(frame.pts).await;
                    return Ok(Some(frame));
                }
                None => {
                    // Playback ends with the media, not with the last decoded frame
                    self.wait_until(duration).await;
                    return Ok(None);
                }
            }
        }
    }

    fn release(&mut self) {
        if self.loaded.take().is_some() {
            debug!("Released {}", self.path.display());
        }
    }
}

/// Compressed AAC packets read from a second handle on the same file
pub struct Mp4AudioTap {
    reader: FileReader,
    track_id: u32,
    timescale: u32,
    sample_count: u32,
    next_sample: u32,
    clock: Arc<PlaybackClock>,
}

impl Mp4AudioTap {
    fn new(reader: FileReader, track_id: u32, clock: Arc<PlaybackClock>) -> Self {
        let (timescale, sample_count) = reader
            .tracks()
            .get(&track_id)
            .map(|track| (track.timescale(), track.sample_count()))
            .unwrap_or((0, 0));
        Self {
            reader,
            track_id,
            timescale,
            sample_count,
            next_sample: 1,
            clock,
        }
    }
}

#[async_trait(?Send)]
impl AudioTap for Mp4AudioTap {
    async fn next_packet(&mut self) -> Result<Option<AudioPacket>, SourceError> {
        while self.next_sample <= self.sample_count {
            let sample_id = self.next_sample;
            self.next_sample += 1;

            let sample = self
                .reader
                .read_sample(self.track_id, sample_id)
                .map_err(|e| SourceError::Decode(format!("audio sample {}: {}", sample_id, e)))?;
            let Some(sample) = sample else {
                continue;
            };

            let packet = AudioPacket {
                start_time: sample.start_time,
                duration: sample.duration,
                timescale: self.timescale,
                is_sync: sample.is_sync,
                bytes: sample.bytes,
            };
            let ahead = packet.start_seconds() - self.clock.position();
            if ahead > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(ahead)).await;
            }
            return Ok(Some(packet));
        }
        Ok(None)
    }
}
