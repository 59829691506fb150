//! The audio chunk carrier (C1) and its stream-shape metadata.

use crate::error::{Error, Result};
use crate::format::{self, AudioFormat};

/// Shape of an audio stream: format, rate, channel count, and an optional
/// language tag carried through translation-connector stages.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Sample encoding.
    pub audio_format: AudioFormat,
    /// Sample rate in Hz. Must be `> 0`.
    pub sample_rate_hz: u32,
    /// Channel count. Must be `>= 1`.
    pub channels: u16,
    /// Optional BCP-47-ish language tag (e.g. `"en"`, `"eng"`).
    pub language_tag: Option<String>,
}

impl StreamConfig {
    /// Builds a mono, untagged stream config.
    #[must_use]
    pub fn mono(audio_format: AudioFormat, sample_rate_hz: u32) -> Self {
        Self {
            audio_format,
            sample_rate_hz,
            channels: 1,
            language_tag: None,
        }
    }

    fn bytes_per_frame(&self) -> usize {
        self.audio_format.sample_size_bytes() * self.channels as usize
    }

    fn describe(&self) -> String {
        format!(
            "{:?}@{}Hz x{}ch",
            self.audio_format, self.sample_rate_hz, self.channels
        )
    }

    fn compatible(&self, other: &StreamConfig) -> bool {
        self.audio_format == other.audio_format
            && self.sample_rate_hz == other.sample_rate_hz
            && self.channels == other.channels
    }
}

/// An immutable-by-default chunk of audio, uniform in format/rate/channels.
///
/// Frames are cheap to clone (the payload is a plain byte vector) and carry
/// no threading primitives; transport between nodes copies or moves the
/// payload, never shares it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    config: StreamConfig,
    payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame, validating that `payload` is a whole number of frames.
    pub fn new(config: StreamConfig, payload: Vec<u8>) -> Result<Self> {
        let unit = config.bytes_per_frame();
        if unit != 0 && payload.len() % unit != 0 {
            return Err(Error::Malformed {
                payload_len: payload.len(),
                unit_bytes: unit,
            });
        }
        Ok(Self { config, payload })
    }

    /// Builds an empty frame sharing `config`'s format/rate/channels.
    #[must_use]
    pub fn empty(config: StreamConfig) -> Self {
        Self {
            config,
            payload: Vec::new(),
        }
    }

    /// The frame's format/rate/channel shape.
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Raw interleaved payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the frame, returning the raw payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Number of complete per-channel samples ("frames" in the PCM sense).
    #[must_use]
    pub fn frame_count(&self) -> usize {
        let unit = self.config.bytes_per_frame();
        if unit == 0 {
            0
        } else {
            self.payload.len() / unit
        }
    }

    /// Duration in milliseconds, derived from `frame_count` and the sample rate.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.frame_count() as f64 * 1000.0 / f64::from(self.config.sample_rate_hz)
    }

    /// True if the frame carries no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns a new frame with `other`'s payload appended, failing if the
    /// two frames' `(format, rate, channels)` disagree.
    pub fn append(&self, other: &Frame) -> Result<Frame> {
        if !self.config.compatible(&other.config) {
            return Err(Error::IncompatibleFormat {
                context: "Frame::append".to_string(),
                expected: self.config.describe(),
                actual: other.config.describe(),
            });
        }
        let mut payload = self.payload.clone();
        payload.extend_from_slice(&other.payload);
        Ok(Frame {
            config: self.config.clone(),
            payload,
        })
    }

    /// In-place variant of [`Frame::append`].
    pub fn append_in_place(&mut self, other: &Frame) -> Result<()> {
        if !self.config.compatible(&other.config) {
            return Err(Error::IncompatibleFormat {
                context: "Frame::append_in_place".to_string(),
                expected: self.config.describe(),
                actual: other.config.describe(),
            });
        }
        self.payload.extend_from_slice(&other.payload);
        Ok(())
    }

    /// Returns a new frame carrying the first `n_frames` frames.
    #[must_use]
    pub fn head(&self, n_frames: usize) -> Frame {
        let unit = self.config.bytes_per_frame();
        let n_bytes = (n_frames * unit).min(self.payload.len());
        Frame {
            config: self.config.clone(),
            payload: self.payload[..n_bytes].to_vec(),
        }
    }

    /// Returns a new frame carrying the last `n_frames` frames.
    #[must_use]
    pub fn tail(&self, n_frames: usize) -> Frame {
        let unit = self.config.bytes_per_frame();
        let n_bytes = (n_frames * unit).min(self.payload.len());
        let start = self.payload.len() - n_bytes;
        Frame {
            config: self.config.clone(),
            payload: self.payload[start..].to_vec(),
        }
    }

    /// Returns a new frame carrying the last `seconds` worth of audio.
    #[must_use]
    pub fn tail_seconds(&self, seconds: f64) -> Frame {
        let n_frames = (seconds * f64::from(self.config.sample_rate_hz)) as usize;
        self.tail(n_frames)
    }

    /// Drops the first `n_frames` frames, keeping the remainder in place.
    pub fn advance(&mut self, n_frames: usize) {
        let unit = self.config.bytes_per_frame();
        let n_bytes = (n_frames * unit).min(self.payload.len());
        self.payload.drain(..n_bytes);
    }

    /// Converts this frame's payload to signed 16-bit little-endian, per the
    /// exact rules of §4.1. Drops any trailing partial sample (caller should
    /// log a warning when `payload.len() % sample_size != 0`).
    #[must_use]
    pub fn to_pcm16_le(&self) -> Vec<u8> {
        format::to_pcm16_le(self.config.audio_format, &self.payload)
    }

    /// Converts this frame to mono FLOAT32 in `[-1.0, 1.0]`, downmixing by
    /// arithmetic mean or by selecting one channel, per §4.2.
    #[must_use]
    pub fn sanitize_to_mono_float32(&self, mono_strategy: MonoStrategy) -> Frame {
        let samples = format::pcm_to_float32(self.config.audio_format, &self.payload);
        let channels = self.config.channels as usize;
        let mono: Vec<f32> = if channels <= 1 {
            samples
        } else {
            match mono_strategy {
                MonoStrategy::Mean => samples
                    .chunks_exact(channels)
                    .map(|c| c.iter().sum::<f32>() / channels as f32)
                    .collect(),
                MonoStrategy::Select(idx) => samples
                    .chunks_exact(channels)
                    .map(|c| c[idx.min(channels - 1)])
                    .collect(),
            }
        };
        let clipped: Vec<f32> = mono.into_iter().map(|s| s.clamp(-1.0, 1.0)).collect();
        let payload = format::float32_to_pcm(AudioFormat::Float32, &clipped);
        Frame {
            config: StreamConfig {
                audio_format: AudioFormat::Float32,
                sample_rate_hz: self.config.sample_rate_hz,
                channels: 1,
                language_tag: self.config.language_tag.clone(),
            },
            payload,
        }
    }

    /// Interprets the payload as `f32` samples (FLOAT32 frames only).
    #[must_use]
    pub fn as_f32_samples(&self) -> Vec<f32> {
        format::pcm_to_float32(AudioFormat::Float32, &self.payload)
    }

    /// Builds a FLOAT32 frame from raw `f32` samples, sharing rate/channels/language.
    #[must_use]
    pub fn from_f32_samples(config: &StreamConfig, samples: &[f32]) -> Frame {
        Frame {
            config: StreamConfig {
                audio_format: AudioFormat::Float32,
                ..config.clone()
            },
            payload: format::float32_to_pcm(AudioFormat::Float32, samples),
        }
    }
}

/// Downmix strategy used by input sanitization (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonoStrategy {
    /// Arithmetic mean across channels.
    Mean,
    /// Select a single channel by index.
    Select(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> StreamConfig {
        StreamConfig::mono(AudioFormat::Int16, 16000)
    }

    #[test]
    fn frame_integrity_after_new() {
        let f = Frame::new(cfg(), vec![0u8; 8]).unwrap();
        assert_eq!(f.frame_count(), 4);
    }

    #[test]
    fn malformed_payload_rejected() {
        let err = Frame::new(cfg(), vec![0u8; 3]);
        assert!(err.is_err());
    }

    #[test]
    fn append_commutes_frame_count() {
        let a = Frame::new(cfg(), vec![0u8; 8]).unwrap();
        let b = Frame::new(cfg(), vec![0u8; 4]).unwrap();
        let c = a.append(&b).unwrap();
        assert_eq!(c.frame_count(), a.frame_count() + b.frame_count());
    }

    #[test]
    fn append_rejects_incompatible_rate() {
        let a = Frame::new(cfg(), vec![0u8; 4]).unwrap();
        let b = Frame::new(StreamConfig::mono(AudioFormat::Int16, 8000), vec![0u8; 4]).unwrap();
        assert!(a.append(&b).is_err());
    }

    #[test]
    fn head_tail_never_cross_sample_boundary() {
        let f = Frame::new(cfg(), vec![1, 0, 2, 0, 3, 0, 4, 0]).unwrap();
        assert_eq!(f.head(2).payload(), &[1, 0, 2, 0]);
        assert_eq!(f.tail(1).payload(), &[4, 0]);
    }

    #[test]
    fn sanitize_downmixes_stereo_mean() {
        let stereo_cfg = StreamConfig {
            audio_format: AudioFormat::Int16,
            sample_rate_hz: 16000,
            channels: 2,
            language_tag: None,
        };
        let left = 1000i16.to_le_bytes();
        let right = (-1000i16).to_le_bytes();
        let mut payload = vec![];
        payload.extend_from_slice(&left);
        payload.extend_from_slice(&right);
        let f = Frame::new(stereo_cfg, payload).unwrap();
        let mono = f.sanitize_to_mono_float32(MonoStrategy::Mean);
        assert_eq!(mono.config().channels, 1);
        let samples = mono.as_f32_samples();
        assert!((samples[0]).abs() < 1e-6);
    }
}
