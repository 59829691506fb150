//! Arbitrary-ratio sample rate conversion (§4.4).
//!
//! Implemented as windowed-sinc interpolation against a continuously
//! maintained per-channel history buffer: the fractional read position is
//! carried across `emit` calls (rather than reset per chunk) so long
//! sessions accumulate no drift, matching the SoX-resampler-style guarantee
//! in the spec.

use synchro_core::format::{float32_to_pcm, pcm_to_float32};
use synchro_core::{AudioFormat, Contextual, Emitter, Event, EventBus, Frame, Receiver, StreamConfig};

/// Half-width of the windowed-sinc kernel, in input samples.
const HALF_TAPS: usize = 16;

struct ChannelHistory {
    samples: Vec<f32>,
}

/// Converts a single input stream to `to_rate`, preserving format and channel count.
///
/// `to_rate` is all the builder knows at construction time; `from_rate` is
/// only learned once the first frame arrives (§4.4 gives the node no other
/// way to see it sooner), so the spec's "build-time error if input rate
/// equals output rate" can't be enforced here. Instead, the first time
/// `emit` discovers `from_rate == to_rate` it publishes a `resampler.noop`
/// event (if wired to an [`EventBus`]) and logs an error, then becomes a
/// permanent no-op for the rest of the run rather than failing silently.
pub struct Resampler {
    name: String,
    to_rate: u32,
    from_rate: Option<u32>,
    channels: Vec<ChannelHistory>,
    format: Option<AudioFormat>,
    /// Fractional position of the next output sample, in input-sample units,
    /// relative to the start of each channel's history buffer.
    pos: f64,
    language_tag: Option<String>,
    events: Option<EventBus>,
    reported_noop: bool,
}

impl Resampler {
    /// Builds a resampler targeting `to_rate`. The source rate is inferred
    /// from the first frame received.
    #[must_use]
    pub fn new(name: impl Into<String>, to_rate: u32) -> Self {
        Self {
            name: name.into(),
            to_rate,
            from_rate: None,
            channels: Vec::new(),
            format: None,
            pos: 0.0,
            language_tag: None,
            events: None,
            reported_noop: false,
        }
    }

    /// Wires an event bus so a same-rate misconfiguration (§4.4) is reported
    /// once, rather than silently dropping frames for the rest of the run.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    fn step(&self) -> f64 {
        f64::from(self.from_rate.unwrap_or(self.to_rate)) / f64::from(self.to_rate)
    }

    /// Low-pass cutoff as a fraction of the input Nyquist, clamped to avoid
    /// aliasing on downsampling (upsampling keeps the full input band).
    fn cutoff(&self) -> f64 {
        let ratio = f64::from(self.to_rate) / f64::from(self.from_rate.unwrap_or(self.to_rate));
        ratio.min(1.0)
    }
}

impl Contextual for Resampler {}

impl Receiver for Resampler {
    fn receive(&mut self, _source: &str, frame: Frame) {
        if frame.is_empty() {
            return;
        }
        let cfg = frame.config();
        if self.from_rate.is_none() {
            self.from_rate = Some(cfg.sample_rate_hz);
            self.format = Some(cfg.audio_format);
            self.language_tag = cfg.language_tag.clone();
            self.channels = (0..cfg.channels).map(|_| ChannelHistory { samples: Vec::new() }).collect();
        }

        let samples = pcm_to_float32(cfg.audio_format, frame.payload());
        let channels = cfg.channels as usize;
        for (c, hist) in self.channels.iter_mut().enumerate() {
            hist.samples.extend(samples.iter().skip(c).step_by(channels.max(1)));
        }
    }
}

impl Emitter for Resampler {
    fn emit(&mut self) -> Option<Frame> {
        let from_rate = self.from_rate?;
        if from_rate == self.to_rate {
            if !self.reported_noop {
                self.reported_noop = true;
                let message = format!("resampler '{}' configured with from_rate == to_rate == {from_rate}, passing no frames", self.name);
                tracing::error!(node = %self.name, rate = from_rate, "{message}");
                if let Some(events) = &self.events {
                    events.publish(Event::new(self.name.clone(), "resampler.noop", message));
                }
            }
            return None;
        }
        if self.channels.is_empty() || self.channels[0].samples.len() <= 2 * HALF_TAPS {
            return None;
        }

        let step = self.step();
        let cutoff = self.cutoff();
        let available = self.channels[0].samples.len();
        let max_pos = available as f64 - HALF_TAPS as f64 - 1.0;

        let mut outputs: Vec<Vec<f32>> = vec![Vec::new(); self.channels.len()];
        let mut pos = self.pos;
        while pos <= max_pos {
            for (c, hist) in self.channels.iter().enumerate() {
                outputs[c].push(sinc_interpolate(&hist.samples, pos, HALF_TAPS, cutoff));
            }
            pos += step;
        }

        if outputs[0].is_empty() {
            return None;
        }

        // Drop fully-consumed history, keeping enough margin for the next window.
        let consumed = (pos.floor() as usize).saturating_sub(HALF_TAPS);
        for hist in &mut self.channels {
            hist.samples.drain(..consumed.min(hist.samples.len()));
        }
        self.pos = pos - consumed as f64;

        let channels = outputs.len();
        let mut interleaved = vec![0.0f32; outputs[0].len() * channels];
        for (c, ch) in outputs.iter().enumerate() {
            for (i, &s) in ch.iter().enumerate() {
                interleaved[i * channels + c] = s;
            }
        }

        let format = self.format.unwrap_or(AudioFormat::Float32);
        let payload = float32_to_pcm(format, &interleaved);
        let frame = Frame::new(
            StreamConfig {
                audio_format: format,
                sample_rate_hz: self.to_rate,
                channels: channels as u16,
                language_tag: self.language_tag.clone(),
            },
            payload,
        )
        .expect("interleaved resampled buffer is always a whole number of frames");

        tracing::debug!(node = %self.name, from = from_rate, to = self.to_rate, frames = frame.frame_count(), "resampled chunk");
        Some(frame)
    }
}

/// Windowed-sinc interpolation of `buf` at fractional position `pos`, with a
/// Hann-windowed sinc kernel low-passed at `cutoff` (fraction of Nyquist).
fn sinc_interpolate(buf: &[f32], pos: f64, half_taps: usize, cutoff: f64) -> f32 {
    let center = pos.floor() as isize;
    let frac = pos - pos.floor();
    let mut acc = 0.0f64;
    let taps = half_taps as isize;
    for k in -taps..=taps {
        let idx = center + k;
        if idx < 0 || idx as usize >= buf.len() {
            continue;
        }
        let x = k as f64 - frac;
        let sinc = if x.abs() < 1e-9 { 1.0 } else { (std::f64::consts::PI * x * cutoff).sin() / (std::f64::consts::PI * x * cutoff) };
        let window = 0.5 + 0.5 * (std::f64::consts::PI * x / taps as f64).cos();
        let window = if x.abs() > taps as f64 { 0.0 } else { window };
        acc += f64::from(buf[idx as usize]) * sinc * cutoff * window;
    }
    acc.clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_int16(samples: &[i16], rate: u32) -> Frame {
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Frame::new(StreamConfig::mono(AudioFormat::Int16, rate), payload).unwrap()
    }

    #[test]
    fn no_data_before_first_frame() {
        let mut r = Resampler::new("r", 16000);
        assert!(r.emit().is_none());
    }

    #[test]
    fn same_rate_reports_once_and_stays_a_no_op() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use synchro_core::EventBus;

        let events = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        events.subscribe("resampler.noop", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut r = Resampler::new("r", 48000).with_events(events);
        r.receive("in", mono_int16(&[0; 100], 48000));
        assert!(r.emit().is_none());
        assert!(r.emit().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1, "same-rate misconfiguration should be reported exactly once");
    }

    #[test]
    fn downsamples_and_preserves_format() {
        let mut r = Resampler::new("r", 16000);
        let samples: Vec<i16> = (0..4800).map(|i| ((i as f32 * 0.05).sin() * 10000.0) as i16).collect();
        r.receive("in", mono_int16(&samples, 48000));
        let out = r.emit().unwrap();
        assert_eq!(out.config().sample_rate_hz, 16000);
        assert_eq!(out.config().audio_format, AudioFormat::Int16);
        // roughly a third the frames, within a few samples either way
        let expected = samples.len() / 3;
        assert!((out.frame_count() as isize - expected as isize).abs() < 50);
    }

    #[test]
    fn fractional_position_persists_across_emits() {
        let mut r = Resampler::new("r", 16000);
        let samples: Vec<i16> = (0..2000).map(|i| ((i as f32 * 0.05).sin() * 10000.0) as i16).collect();
        r.receive("in", mono_int16(&samples, 48000));
        let first = r.emit();
        r.receive("in", mono_int16(&samples, 48000));
        let second = r.emit();
        assert!(first.is_some());
        assert!(second.is_some());
    }
}
