//! Online Weighted-Prediction-Error dereverberation (C3, §4.9.1).
//!
//! Per-frequency-bin recursive update against a sliding window of recent
//! STFT frames. Cost is `O(F * taps^2)` per input frame; the recursive
//! inverse-covariance update avoids re-estimating reverberation from scratch
//! on every call.

use rustfft::num_complex::Complex32;
use rustfft::{FftPlanner, num_traits::Zero};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

const PSD_FLOOR: f32 = 1e-7;
const DEN_FLOOR: f32 = 1e-6;
const GAIN_CLIP: f32 = 5.0;
const OLA_NORM_FLOOR: f32 = 1e-8;

/// Per-(STFT bin) WPE state: inverse-covariance matrix, filter taps, smoothed
/// power estimate, and a ring of recent spectral frames.
struct BinState {
    /// `taps x taps` matrix, row-major.
    inv_cov: Vec<Complex32>,
    /// Length-`taps` filter.
    filter_taps: Vec<Complex32>,
    power_est: f32,
    /// Ring of the most recent `taps + delay + 1` spectral values, oldest first.
    history: VecDeque<Complex32>,
}

impl BinState {
    fn new(taps: usize, ring_len: usize) -> Self {
        let mut inv_cov = vec![Complex32::zero(); taps * taps];
        for i in 0..taps {
            inv_cov[i * taps + i] = Complex32::new(1.0, 0.0);
        }
        Self {
            inv_cov,
            filter_taps: vec![Complex32::zero(); taps],
            power_est: 1e-4,
            history: VecDeque::from(vec![Complex32::zero(); ring_len]),
        }
    }
}

/// Online WPE processor: holds all per-bin state and the FFT machinery,
/// reinitialized whenever the sample rate changes.
pub struct OnlineWpe {
    n_fft: usize,
    hop: usize,
    taps: usize,
    delay: usize,
    alpha: f32,
    sample_rate_hz: u32,
    window: Vec<f32>,
    bins: Vec<BinState>,
    freq_bins: usize,
}

impl OnlineWpe {
    /// Builds a WPE processor with the given STFT/recursion parameters.
    #[must_use]
    pub fn new(n_fft: usize, hop: usize, taps: usize, delay: usize, alpha: f32, sample_rate_hz: u32) -> Self {
        let freq_bins = n_fft / 2 + 1;
        let ring_len = taps + delay + 1;
        let window = hann_window(n_fft);
        let bins = (0..freq_bins).map(|_| BinState::new(taps, ring_len)).collect();
        Self {
            n_fft,
            hop,
            taps,
            delay,
            alpha,
            sample_rate_hz,
            window,
            bins,
            freq_bins,
        }
    }

    /// Reinitializes all per-bin state (sample-rate change).
    pub fn reset(&mut self, sample_rate_hz: u32) {
        let ring_len = self.taps + self.delay + 1;
        self.bins = (0..self.freq_bins).map(|_| BinState::new(self.taps, ring_len)).collect();
        self.sample_rate_hz = sample_rate_hz;
    }

    /// Current sample rate this state was initialized for.
    #[must_use]
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Dereverberates `input` (mono float32 samples), returning a buffer of
    /// the same length, wet/dry mixed by `wet` (clamped to `[0, 1]`).
    pub fn process_chunk(&mut self, input: &[f32], wet: f32) -> Vec<f32> {
        let wet = wet.clamp(0.0, 1.0);
        if input.is_empty() {
            return Vec::new();
        }

        let frames = self.stft_frames(input);
        let mut fft_planner = FftPlanner::<f32>::new();
        let ifft = fft_planner.plan_fft_inverse(self.n_fft);

        let mut predicted_frames: Vec<Vec<Complex32>> = Vec::with_capacity(frames.len());
        for frame in &frames {
            predicted_frames.push(self.step(frame));
        }

        let wet_signal = self.istft_ola(&predicted_frames, ifft);

        // Trim to the region aligned with the original input length.
        let pad_left = self.n_fft - self.hop;
        let start = pad_left;
        let end = (start + input.len()).min(wet_signal.len());
        let trimmed: Vec<f32> = if start < wet_signal.len() {
            wet_signal[start..end].to_vec()
        } else {
            vec![0.0; input.len()]
        };
        let mut trimmed = trimmed;
        trimmed.resize(input.len(), 0.0);

        trimmed
            .iter()
            .zip(input.iter())
            .map(|(&w, &d)| wet * w + (1.0 - wet) * d)
            .collect()
    }

    /// One recursive update across all bins for a single STFT frame, returning
    /// the predicted (dereverberated) spectral frame.
    fn step(&mut self, frame: &[Complex32]) -> Vec<Complex32> {
        let taps = self.taps;
        let alpha = self.alpha;
        let mut predicted = vec![Complex32::zero(); self.freq_bins];

        for (f, bin) in self.bins.iter_mut().enumerate() {
            bin.history.pop_front();
            bin.history.push_back(frame[f]);

            // window = conj(oldest `taps` entries of the ring)
            let window: Vec<Complex32> = bin.history.iter().take(taps).map(|c| c.conj()).collect();
            let current = *bin.history.back().unwrap();

            let mut dot = Complex32::zero();
            for t in 0..taps {
                dot += bin.filter_taps[t].conj() * window[t];
            }
            let pred = current - dot;
            predicted[f] = pred;

            let power = (alpha * bin.power_est + (1.0 - alpha) * current.norm_sqr()).max(PSD_FLOOR);

            // numerator = inv_cov . window
            let mut numerator = vec![Complex32::zero(); taps];
            for i in 0..taps {
                let mut acc = Complex32::zero();
                for j in 0..taps {
                    acc += bin.inv_cov[i * taps + j] * window[j];
                }
                numerator[i] = acc;
            }

            // denominator = max(alpha*power + conj(window).numerator, den_floor), real
            let mut cross = Complex32::zero();
            for t in 0..taps {
                cross += window[t].conj() * numerator[t];
            }
            let denominator = (alpha * power + cross.re).max(DEN_FLOOR);

            let mut gain: Vec<Complex32> = numerator.iter().map(|&n| n / denominator).collect();
            let norm: f32 = gain.iter().map(Complex32::norm_sqr).sum::<f32>().sqrt();
            if norm > GAIN_CLIP {
                let scale = GAIN_CLIP / norm;
                for g in &mut gain {
                    *g *= scale;
                }
            }

            // inv_cov = (inv_cov - outer(gain, conj(window)) @ inv_cov) / alpha
            let mut new_inv_cov = vec![Complex32::zero(); taps * taps];
            for i in 0..taps {
                for j in 0..taps {
                    let mut correction = Complex32::zero();
                    for k in 0..taps {
                        correction += gain[i] * window[k].conj() * bin.inv_cov[k * taps + j];
                    }
                    new_inv_cov[i * taps + j] = (bin.inv_cov[i * taps + j] - correction) / alpha;
                }
            }
            bin.inv_cov = new_inv_cov;

            for t in 0..taps {
                bin.filter_taps[t] += gain[t] * pred.conj();
            }
            bin.power_est = power;
        }

        predicted
    }

    fn stft_frames(&self, x: &[f32]) -> Vec<Vec<Complex32>> {
        let pad_left = self.n_fft - self.hop;
        let mut padded = vec![0.0f32; pad_left];
        padded.extend_from_slice(x);
        let remainder = (padded.len() - self.n_fft) % self.hop;
        if remainder != 0 {
            padded.extend(std::iter::repeat(0.0).take(self.hop - remainder));
        }
        if padded.len() < self.n_fft {
            padded.resize(self.n_fft, 0.0);
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.n_fft);

        let mut frames = Vec::new();
        let mut start = 0;
        while start + self.n_fft <= padded.len() {
            let mut buf: Vec<Complex32> = padded[start..start + self.n_fft]
                .iter()
                .zip(self.window.iter())
                .map(|(&s, &w)| Complex32::new(s * w, 0.0))
                .collect();
            fft.process(&mut buf);
            frames.push(buf[..self.freq_bins].to_vec());
            start += self.hop;
        }
        frames
    }

    fn istft_ola(&self, frames: &[Vec<Complex32>], ifft: Arc<dyn rustfft::Fft<f32>>) -> Vec<f32> {
        if frames.is_empty() {
            return Vec::new();
        }
        let total_len = (frames.len() - 1) * self.hop + self.n_fft;
        let mut out = vec![0.0f32; total_len];
        let mut norm = vec![0.0f32; total_len];

        for (i, half) in frames.iter().enumerate() {
            let mut full = vec![Complex32::zero(); self.n_fft];
            for (k, &v) in half.iter().enumerate() {
                full[k] = v;
                if k != 0 && k != self.n_fft / 2 {
                    full[self.n_fft - k] = v.conj();
                }
            }
            ifft.process(&mut full);
            let start = i * self.hop;
            for n in 0..self.n_fft {
                let w = self.window[n];
                out[start + n] += full[n].re / self.n_fft as f32 * w;
                norm[start + n] += w * w;
            }
        }

        for (o, n) in out.iter_mut().zip(norm.iter()) {
            *o /= n.max(OLA_NORM_FLOOR);
        }
        out
    }
}

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (n - 1) as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_in_silence_out_bounded() {
        let mut wpe = OnlineWpe::new(256, 64, 4, 2, 0.92, 16000);
        let input = vec![0.0f32; 4000];
        let out = wpe.process_chunk(&input, 1.0);
        assert_eq!(out.len(), input.len());
        for &s in &out {
            assert!(s.is_finite());
        }
        for bin in &wpe.bins {
            for c in &bin.inv_cov {
                assert!(c.re.is_finite() && c.im.is_finite());
            }
            for c in &bin.filter_taps {
                assert!(c.re.is_finite() && c.im.is_finite());
            }
        }
    }

    #[test]
    fn output_length_matches_input_for_nonzero_signal() {
        let mut wpe = OnlineWpe::new(256, 64, 4, 2, 0.92, 16000);
        let input: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        let out = wpe.process_chunk(&input, 0.5);
        assert_eq!(out.len(), input.len());
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn dry_mix_is_pass_through() {
        let mut wpe = OnlineWpe::new(256, 64, 4, 2, 0.92, 16000);
        let input: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        let out = wpe.process_chunk(&input, 0.0);
        for (o, i) in out.iter().zip(input.iter()) {
            assert!((o - i).abs() < 1e-4);
        }
    }
}
