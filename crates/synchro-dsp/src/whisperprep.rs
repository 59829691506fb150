//! Whisper-prep conditioning chain (§4.9): online WPE dereverberation, peak
//! normalization, a soft tanh limiter, and zero-phase Butterworth HPF/LPF,
//! run over a float32 mono accumulator on every arrival.
//!
//! The accumulator is reprocessed in full on each `emit` (rather than
//! incrementally), matching the reference chain's behavior of always basing
//! WPE/filtering decisions on the same context window; only the *new* tail is
//! handed downstream, and the accumulator is then trimmed to
//! `max(keep_context_seconds, new_samples)` of *processed* signal.

use synchro_core::{AudioFormat, Biquad, Contextual, Emitter, Frame, OnlineWpe, Receiver, StreamConfig};

const WPE_N_FFT: usize = 2048;
const WPE_HOP: usize = 512;
const WPE_TAPS: usize = 12;
const WPE_DELAY: usize = 3;
const WPE_ALPHA: f32 = 0.92;
const LPF_MIN_HZ_BELOW_NYQUIST: f64 = 200.0;

/// Aggressiveness preset for the WPE stage's wet/dry mix. The chain's
/// internal STFT/recursion parameters stay fixed across presets (see
/// SPEC_FULL §4.9's ADDED note); only the mix varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WpeStrength {
    /// Half wet, half dry.
    Mild,
    /// Fully wet (default).
    Strong,
    /// Fully wet; reserved for a more aggressive future WPE preset.
    Extreme,
}

impl WpeStrength {
    fn wet_mix(self) -> f32 {
        match self {
            WpeStrength::Mild => 0.5,
            WpeStrength::Strong | WpeStrength::Extreme => 1.0,
        }
    }
}

/// Configuration mirroring the `preparer` NodeSpec fields (§6).
#[derive(Debug, Clone)]
pub struct WhisperPrepConfig {
    /// Minimum seconds of context to pre-fill the accumulator with at init.
    pub min_buffer_sec: f64,
    /// Seconds of processed-signal context retained after each emit.
    pub keep_context_sec: f64,
    /// Run the online WPE dereverberation stage.
    pub enable_wpe: bool,
    /// Run peak normalization to `headroom_db`.
    pub enable_normalize: bool,
    /// Run the soft tanh limiter at `true_peak_dbfs`.
    pub enable_limiter: bool,
    /// Run the zero-phase HPF/LPF stage.
    pub enable_filters: bool,
    /// Target peak, in dB below 0 dBFS.
    pub headroom_db: f64,
    /// Limiter ceiling, in dBFS (typically negative, e.g. -1.8).
    pub true_peak_dbfs: f64,
    /// High-pass cutoff in Hz; `None` or `<= 0` disables the HPF.
    pub hpf_hz: Option<f64>,
    /// Low-pass cutoff as a fraction of Nyquist.
    pub lpf_ratio_to_nyquist: f64,
    /// Butterworth filter order for both HPF and LPF (rounded down to even, min 2).
    pub filter_order: usize,
    /// WPE wet/dry preset.
    pub wpe_strength: WpeStrength,
}

impl Default for WhisperPrepConfig {
    fn default() -> Self {
        Self {
            min_buffer_sec: 0.5,
            keep_context_sec: 1.0,
            enable_wpe: true,
            enable_normalize: true,
            enable_limiter: true,
            enable_filters: true,
            headroom_db: 10.0,
            true_peak_dbfs: -1.8,
            hpf_hz: Some(65.0),
            lpf_ratio_to_nyquist: 0.975,
            filter_order: 4,
            wpe_strength: WpeStrength::Strong,
        }
    }
}

/// The conditioning chain node: requires FLOAT32 mono input, emits FLOAT32
/// mono output at the same rate.
pub struct WhisperPrep {
    name: String,
    config: WhisperPrepConfig,
    sample_rate_hz: Option<u32>,
    language_tag: Option<String>,
    accumulator: Vec<f32>,
    pending_new_samples: usize,
    wpe: Option<OnlineWpe>,
}

impl WhisperPrep {
    /// Builds a WhisperPrep node from its config.
    #[must_use]
    pub fn new(name: impl Into<String>, config: WhisperPrepConfig) -> Self {
        Self {
            name: name.into(),
            config,
            sample_rate_hz: None,
            language_tag: None,
            accumulator: Vec::new(),
            pending_new_samples: 0,
            wpe: None,
        }
    }

    fn min_buffer_samples(&self, rate: u32) -> usize {
        (self.config.min_buffer_sec * f64::from(rate)) as usize
    }

    fn keep_context_samples(&self, rate: u32) -> usize {
        (self.config.keep_context_sec * f64::from(rate)) as usize
    }

    fn reinit(&mut self, rate: u32) {
        self.sample_rate_hz = Some(rate);
        self.wpe = Some(OnlineWpe::new(WPE_N_FFT, WPE_HOP, WPE_TAPS, WPE_DELAY, WPE_ALPHA, rate));
        self.accumulator = vec![0.0; self.min_buffer_samples(rate)];
        self.pending_new_samples = 0;
        tracing::debug!(node = %self.name, rate, "whisperprep reinitialized for new sample rate");
    }

    fn run_chain(&mut self, rate: u32) -> Vec<f32> {
        let mut x = self.accumulator.clone();

        if self.config.enable_wpe {
            let wet = self.config.wpe_strength.wet_mix();
            x = self.wpe.as_mut().expect("wpe initialized in reinit").process_chunk(&x, wet);
        }

        if self.config.enable_normalize {
            let peak = x.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
            let target = 10f32.powf(-(self.config.headroom_db as f32) / 20.0);
            let gain = if peak > 1e-9 { target / peak } else { 1.0 };
            for s in &mut x {
                *s *= gain;
            }
        }

        if self.config.enable_limiter {
            let ceiling = 10f32.powf((self.config.true_peak_dbfs / 20.0) as f32);
            let peak = x.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
            if peak > ceiling {
                let scale = ceiling / peak.max(1e-12);
                let tanh_vals: Vec<f32> = x.iter().map(|&s| (2.0 * s * scale).tanh()).collect();
                let max_tanh = tanh_vals.iter().fold(0.0f32, |m, &v| m.max(v.abs())).max(1e-12);
                x = tanh_vals.into_iter().map(|v| v / max_tanh * ceiling).collect();
            }
        }

        if self.config.enable_filters {
            let nyquist = 0.5 * f64::from(rate);
            let sections = (self.config.filter_order / 2).max(1);
            let qs = butterworth_qs(sections);

            if let Some(hpf_hz) = self.config.hpf_hz {
                if hpf_hz > 0.0 {
                    let clamped_hz = hpf_hz.clamp(1e-6, 0.999_999 * nyquist) as f32;
                    let coeffs: Vec<_> = qs
                        .iter()
                        .map(|&q| synchro_core::highpass_coefficients(clamped_hz, q, rate as f32))
                        .collect();
                    x = filtfilt(&x, &coeffs);
                }
            }

            let lpf_hz = (self.config.lpf_ratio_to_nyquist * nyquist).min(nyquist - LPF_MIN_HZ_BELOW_NYQUIST);
            if lpf_hz > 0.0 && lpf_hz < nyquist {
                let coeffs: Vec<_> = qs
                    .iter()
                    .map(|&q| synchro_core::lowpass_coefficients(lpf_hz as f32, q, rate as f32))
                    .collect();
                x = filtfilt(&x, &coeffs);
            }
        }

        for s in &mut x {
            if !s.is_finite() {
                *s = 0.0;
            }
            *s = s.clamp(-1.0, 1.0);
        }

        x
    }
}

impl Contextual for WhisperPrep {}

impl Receiver for WhisperPrep {
    fn receive(&mut self, _source: &str, frame: Frame) {
        if frame.is_empty() {
            return;
        }
        let cfg = frame.config();
        if cfg.audio_format != AudioFormat::Float32 || cfg.channels != 1 {
            tracing::error!(
                node = %self.name,
                format = ?cfg.audio_format,
                channels = cfg.channels,
                "whisperprep requires FLOAT32 mono input; dropping frame"
            );
            return;
        }

        if self.sample_rate_hz != Some(cfg.sample_rate_hz) {
            self.reinit(cfg.sample_rate_hz);
        }
        self.language_tag = cfg.language_tag.clone();

        let samples = frame.as_f32_samples();
        self.accumulator.extend_from_slice(&samples);
        self.pending_new_samples += samples.len();
    }
}

impl Emitter for WhisperPrep {
    fn emit(&mut self) -> Option<Frame> {
        let rate = self.sample_rate_hz?;
        if self.pending_new_samples == 0 {
            return None;
        }

        let processed = self.run_chain(rate);
        let n_in = self.pending_new_samples;
        let out_samples: Vec<f32> = if processed.len() < n_in {
            tracing::warn!(node = %self.name, "whisperprep chain shortened the buffer; passing through unprocessed tail");
            self.accumulator[self.accumulator.len() - n_in..].to_vec()
        } else {
            processed[processed.len() - n_in..].to_vec()
        };

        let keep = self.keep_context_samples(rate).max(n_in).min(processed.len());
        self.accumulator = processed[processed.len() - keep..].to_vec();
        self.pending_new_samples = 0;

        let config = StreamConfig {
            audio_format: AudioFormat::Float32,
            sample_rate_hz: rate,
            channels: 1,
            language_tag: self.language_tag.clone(),
        };
        let out = Frame::from_f32_samples(&config, &out_samples);
        tracing::debug!(node = %self.name, samples = out_samples.len(), "whisperprep emitted chunk");
        Some(out)
    }
}

/// Q factors for an `2*sections`-order Butterworth cascade, one per biquad section.
fn butterworth_qs(sections: usize) -> Vec<f32> {
    let order = (sections * 2) as f32;
    (1..=sections)
        .map(|k| {
            let theta = (2.0 * k as f32 - 1.0) * std::f32::consts::PI / (2.0 * order);
            1.0 / (2.0 * theta.sin())
        })
        .collect()
}

fn biquad_cascade(x: &[f32], coeffs: &[(f32, f32, f32, f32, f32, f32)]) -> Vec<f32> {
    let mut sections: Vec<Biquad> = coeffs
        .iter()
        .map(|&(b0, b1, b2, a0, a1, a2)| {
            let mut bq = Biquad::new();
            bq.set_coefficients(b0, b1, b2, a0, a1, a2);
            bq
        })
        .collect();
    x.iter()
        .map(|&s| {
            let mut v = s;
            for bq in &mut sections {
                v = bq.process(v);
            }
            v
        })
        .collect()
}

/// Forward-backward (zero-phase) filtering through a biquad cascade.
fn filtfilt(x: &[f32], coeffs: &[(f32, f32, f32, f32, f32, f32)]) -> Vec<f32> {
    let forward = biquad_cascade(x, coeffs);
    let reversed: Vec<f32> = forward.into_iter().rev().collect();
    let forward_again = biquad_cascade(&reversed, coeffs);
    forward_again.into_iter().rev().collect()
}
