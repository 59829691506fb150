//! File input node (C6, `input_file` NodeSpec, §4.2.1).
//!
//! Reads the whole file into memory at `acquire` (file inputs are bounded),
//! pre-downmixes to mono in the *native* bit-width so later per-chunk
//! slicing stays byte-aligned, then paces emission to wall-clock time to
//! model a live source, applying an initial delay of silence and optional
//! looping.

use std::path::PathBuf;
use std::time::Instant;

use synchro_core::format::{float32_to_pcm, pcm_to_float32};
use synchro_core::{Contextual, Emitter, Frame, LifecycleResult, MonoStrategy, StreamConfig};

use crate::wav::read_wav_raw;

/// Minimum amount of audio emitted per `emit` call, regardless of elapsed
/// wall-clock time (§4.2.1: "emits at least `min_chunk = 10 ms` worth").
const MIN_CHUNK_SECS: f64 = 0.010;

/// Reads a WAV file and emits it at wall-clock pace as mono FLOAT32.
pub struct FileInputNode {
    name: String,
    path: PathBuf,
    looping: bool,
    delay_secs: f64,
    mono_strategy: MonoStrategy,
    /// Whether the final sanitized output is converted to FLOAT32 (§6
    /// `input_file`'s `enforce_float32`). When `false`, the node still
    /// downmixes but leaves the native bit-width untouched.
    enforce_float32: bool,
    /// `start`/`duration` (§9 Open Question): accepted and stored, not yet
    /// exercised by `emit` - reserved for a future sub-range playback
    /// calling convention.
    #[allow(dead_code)]
    start: u64,
    #[allow(dead_code)]
    duration: Option<u64>,

    native_config: Option<StreamConfig>,
    buffer: Vec<u8>,
    cursor: usize,
    delay_bytes_remaining: usize,
    last_emit: Option<Instant>,
    exhausted: bool,
}

impl FileInputNode {
    /// Builds a file input node. `start`/`duration` are reserved fields
    /// (§9) and have no effect yet.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        looping: bool,
        delay_secs: f64,
        mono_strategy: MonoStrategy,
        enforce_float32: bool,
        start: u64,
        duration: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            looping,
            delay_secs,
            mono_strategy,
            enforce_float32,
            start,
            duration,
            native_config: None,
            buffer: Vec::new(),
            cursor: 0,
            delay_bytes_remaining: 0,
            last_emit: None,
            exhausted: false,
        }
    }
}

impl Contextual for FileInputNode {
    fn acquire(&mut self) -> LifecycleResult {
        let (cfg, raw) = read_wav_raw(&self.path).map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
        let channels = cfg.channels as usize;

        let mono_bytes = if channels > 1 {
            let samples = pcm_to_float32(cfg.audio_format, &raw);
            let mono: Vec<f32> = match self.mono_strategy {
                MonoStrategy::Mean => samples
                    .chunks_exact(channels)
                    .map(|c| c.iter().sum::<f32>() / channels as f32)
                    .collect(),
                MonoStrategy::Select(idx) => samples
                    .chunks_exact(channels)
                    .map(|c| c[idx.min(channels - 1)])
                    .collect(),
            };
            float32_to_pcm(cfg.audio_format, &mono)
        } else {
            raw
        };

        let unit = cfg.audio_format.sample_size_bytes();
        self.delay_bytes_remaining = (self.delay_secs * f64::from(cfg.sample_rate_hz)).round() as usize * unit;
        self.native_config = Some(StreamConfig {
            channels: 1,
            ..cfg
        });
        self.buffer = mono_bytes;
        self.cursor = 0;
        self.exhausted = false;
        self.last_emit = None;
        tracing::info!(node = %self.name, path = %self.path.display(), bytes = self.buffer.len(), "file input: loaded");
        Ok(())
    }
}

impl Emitter for FileInputNode {
    fn emit(&mut self) -> Option<Frame> {
        let cfg = self.native_config.clone()?;
        let unit = cfg.audio_format.sample_size_bytes();

        let now = Instant::now();
        let elapsed = self.last_emit.map_or(MIN_CHUNK_SECS, |t| now.duration_since(t).as_secs_f64());
        self.last_emit = Some(now);

        let min_chunk_bytes = (MIN_CHUNK_SECS * f64::from(cfg.sample_rate_hz)).round() as usize * unit;
        let elapsed_bytes = (elapsed * f64::from(cfg.sample_rate_hz)).round() as usize * unit;
        let need_bytes = elapsed_bytes.max(min_chunk_bytes);

        if self.delay_bytes_remaining > 0 {
            let take = need_bytes.min(self.delay_bytes_remaining);
            self.delay_bytes_remaining -= take;
            return Frame::new(cfg, vec![0u8; take]).ok();
        }

        if self.exhausted {
            return None;
        }

        let mut out = Vec::with_capacity(need_bytes);
        let mut remaining = need_bytes;
        while remaining > 0 {
            if self.buffer.is_empty() {
                self.exhausted = true;
                break;
            }
            let avail = self.buffer.len() - self.cursor;
            if avail == 0 {
                if self.looping {
                    self.cursor = 0;
                    continue;
                }
                self.exhausted = true;
                break;
            }
            let take = remaining.min(avail);
            out.extend_from_slice(&self.buffer[self.cursor..self.cursor + take]);
            self.cursor += take;
            remaining -= take;
        }

        if out.is_empty() {
            return None;
        }
        let frame = Frame::new(cfg, out).ok()?;
        if self.enforce_float32 {
            Some(frame.sanitize_to_mono_float32(MonoStrategy::Mean))
        } else {
            Some(frame)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synchro_core::AudioFormat;
    use tempfile::NamedTempFile;

    fn write_fixture(looping: bool) -> (NamedTempFile, FileInputNode) {
        let samples: Vec<f32> = (0..4800).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        let payload = float32_to_pcm(AudioFormat::Float32, &samples);
        let config = StreamConfig::mono(AudioFormat::Float32, 48000);
        let file = NamedTempFile::new().unwrap();
        crate::wav::write_wav_raw(file.path(), &config, &payload).unwrap();
        let node = FileInputNode::new("in", file.path(), looping, 0.0, MonoStrategy::Mean, true, 0, None);
        (file, node)
    }

    #[test]
    fn emits_float32_mono_after_acquire() {
        let (_file, mut node) = write_fixture(false);
        node.acquire().unwrap();
        let frame = node.emit().unwrap();
        assert_eq!(frame.config().audio_format, AudioFormat::Float32);
        assert_eq!(frame.config().channels, 1);
    }

    #[test]
    fn non_looping_eventually_returns_none() {
        let (_file, mut node) = write_fixture(false);
        node.acquire().unwrap();
        let mut saw_none = false;
        for _ in 0..50 {
            if node.emit().is_none() {
                saw_none = true;
                break;
            }
        }
        assert!(saw_none, "non-looping file input should exhaust eventually");
    }

    #[test]
    fn looping_never_returns_none_once_delay_clears() {
        let (_file, mut node) = write_fixture(true);
        node.acquire().unwrap();
        for _ in 0..50 {
            assert!(node.emit().is_some());
        }
    }

    #[test]
    fn delay_emits_silence_first() {
        let (_file, mut node) = write_fixture(false);
        node.delay_secs = 0.05;
        node.acquire().unwrap();
        let frame = node.emit().unwrap();
        assert!(frame.as_f32_samples().iter().all(|&s| s == 0.0));
    }
}
