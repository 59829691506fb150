//! Peak normalization to a target headroom (§4.6).

use synchro_core::format::{float32_to_pcm, pcm_to_float32};
use synchro_core::{Contextual, Emitter, Frame, Receiver};

/// Concatenates whatever has arrived since the last `emit` and scales it so
/// its peak sits at `10^(-headroom_db/20)` of full scale. Format and rate
/// pass through unchanged.
pub struct Normalizer {
    name: String,
    headroom_db: f64,
    buffer: Option<Frame>,
}

impl Normalizer {
    /// Builds a normalizer targeting `headroom_db` dB below 0 dBFS.
    #[must_use]
    pub fn new(name: impl Into<String>, headroom_db: f64) -> Self {
        Self {
            name: name.into(),
            headroom_db,
            buffer: None,
        }
    }
}

impl Contextual for Normalizer {}

impl Receiver for Normalizer {
    fn receive(&mut self, _source: &str, frame: Frame) {
        self.buffer = Some(match self.buffer.take() {
            Some(buf) => buf.append(&frame).unwrap_or(frame),
            None => frame,
        });
    }
}

impl Emitter for Normalizer {
    fn emit(&mut self) -> Option<Frame> {
        let buffer = self.buffer.take()?;
        if buffer.is_empty() {
            return None;
        }

        let cfg = buffer.config().clone();
        let samples = pcm_to_float32(cfg.audio_format, buffer.payload());
        let peak = samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()));

        let target_peak = 10f32.powf(-(self.headroom_db as f32) / 20.0);
        let gain = if peak > 1e-9 { target_peak / peak } else { 1.0 };

        let normalized: Vec<f32> = samples.iter().map(|&s| (s * gain).clamp(-1.0, 1.0)).collect();
        let payload = float32_to_pcm(cfg.audio_format, &normalized);

        tracing::debug!(node = %self.name, peak_in = peak, gain, "normalized chunk");
        Frame::new(cfg, payload).ok()
    }
}
