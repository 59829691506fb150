//! Spectral-subtraction denoiser (§4.7).
//!
//! Hann-windowed STFT at `frame_size=1024`, `hop=512`; magnitudes below a
//! `mean(|X|) * threshold` noise estimate are floored to `0.1 * |X|`, phase
//! is kept, and the result is reconstructed via overlap-add then
//! peak-normalized to `0.9` of full scale.
//!
//! The noise-estimate formula over-subtracts on wideband signals (an Open
//! Question in the spec, preserved here for behavioral parity rather than
//! "fixed" - see DESIGN.md).

use rustfft::FftPlanner;
use rustfft::num_complex::Complex32;
use rustfft::num_traits::Zero;
use synchro_core::format::{float32_to_pcm, pcm_to_float32};
use synchro_core::{Contextual, Emitter, Frame, Receiver};

const FRAME_SIZE: usize = 1024;
const HOP: usize = 512;

/// Accumulates a whole buffer per emit, denoises it, and clears the buffer -
/// matching the teacher's batch-per-chunk processor shape.
pub struct Denoiser {
    name: String,
    threshold: f32,
    buffer: Option<Frame>,
}

impl Denoiser {
    /// Builds a denoiser with the given noise-floor `threshold` multiplier.
    #[must_use]
    pub fn new(name: impl Into<String>, threshold: f32) -> Self {
        Self {
            name: name.into(),
            threshold,
            buffer: None,
        }
    }
}

impl Contextual for Denoiser {}

impl Receiver for Denoiser {
    fn receive(&mut self, _source: &str, frame: Frame) {
        self.buffer = Some(match self.buffer.take() {
            Some(buf) => buf.append(&frame).unwrap_or(frame),
            None => frame,
        });
    }
}

impl Emitter for Denoiser {
    fn emit(&mut self) -> Option<Frame> {
        let buffer = self.buffer.take()?;
        if buffer.is_empty() {
            return None;
        }

        let cfg = buffer.config().clone();
        let samples = pcm_to_float32(cfg.audio_format, buffer.payload());

        let denoised = if samples.len() < FRAME_SIZE {
            samples
        } else {
            spectral_subtract(&samples, self.threshold)
        };

        tracing::debug!(node = %self.name, samples = denoised.len(), "denoised chunk");
        let payload = float32_to_pcm(cfg.audio_format, &denoised);
        Frame::new(cfg, payload).ok()
    }
}

fn spectral_subtract(input: &[f32], threshold: f32) -> Vec<f32> {
    let window = hann_window(FRAME_SIZE);
    let pad = (FRAME_SIZE - input.len() % FRAME_SIZE) % FRAME_SIZE;
    let mut padded = input.to_vec();
    padded.extend(std::iter::repeat(0.0).take(pad));
    let mut output = vec![0.0f32; padded.len()];

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);
    let ifft = planner.plan_fft_inverse(FRAME_SIZE);
    let half = FRAME_SIZE / 2 + 1;

    let mut start = 0;
    while start + FRAME_SIZE <= padded.len() {
        let mut buf: Vec<Complex32> = padded[start..start + FRAME_SIZE]
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex32::new(s * w, 0.0))
            .collect();
        fft.process(&mut buf);

        let magnitude: Vec<f32> = buf[..half].iter().map(Complex32::norm).collect();
        let mean_mag = magnitude.iter().sum::<f32>() / magnitude.len() as f32;
        let noise_estimate = mean_mag * threshold;

        let mut spectrum = vec![Complex32::zero(); FRAME_SIZE];
        for (k, &c) in buf[..half].iter().enumerate() {
            let mag = magnitude[k];
            let floored = (mag - noise_estimate).max(mag * 0.1);
            let phase = c.arg();
            let shaped = Complex32::from_polar(floored, phase);
            spectrum[k] = shaped;
            if k != 0 && k != FRAME_SIZE / 2 {
                spectrum[FRAME_SIZE - k] = shaped.conj();
            }
        }

        ifft.process(&mut spectrum);
        for (n, c) in spectrum.iter().enumerate() {
            output[start + n] += c.re / FRAME_SIZE as f32 * window[n];
        }
        start += HOP;
    }

    output.truncate(input.len());
    let peak = output.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
    if peak > 0.0 {
        let gain = 0.9 / peak;
        for s in &mut output {
            *s *= gain;
        }
    }
    output
}

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use synchro_core::{AudioFormat, StreamConfig};

    fn mono_float(samples: &[f32]) -> Frame {
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Frame::new(StreamConfig::mono(AudioFormat::Float32, 16000), payload).unwrap()
    }

    #[test]
    fn short_input_passes_through_unchanged() {
        let mut d = Denoiser::new("den", 0.5);
        d.receive("in", mono_float(&[0.1, 0.2, -0.1]));
        let out = d.emit().unwrap();
        assert_eq!(out.frame_count(), 3);
    }

    #[test]
    fn output_length_matches_input_and_peak_bounded() {
        let mut d = Denoiser::new("den", 0.5);
        let samples: Vec<f32> = (0..4000).map(|i| (i as f32 * 0.02).sin() * 0.3).collect();
        d.receive("in", mono_float(&samples));
        let out = d.emit().unwrap();
        assert_eq!(out.frame_count(), samples.len());
        let peak = out.as_f32_samples().iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(peak <= 0.9 + 1e-3);
    }

    #[test]
    fn buffer_clears_after_emit() {
        let mut d = Denoiser::new("den", 0.5);
        d.receive("in", mono_float(&[0.1; 2000]));
        assert!(d.emit().is_some());
        assert!(d.emit().is_none());
    }
}
