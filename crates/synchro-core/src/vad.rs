//! Energy-threshold voice-activity gate (C2).

use std::collections::VecDeque;

/// Outcome of a [`VoiceActivityDetector::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceActivity {
    /// Rolling buffer has not yet reached `buffer_seconds` of history.
    NotEnoughInfo,
    /// Mean absolute amplitude is above `threshold`.
    Speech,
    /// Mean absolute amplitude is at or below `threshold`.
    NonSpeech,
}

/// Rolling-window energy-threshold VAD over INT16 samples (§4.5).
pub struct VoiceActivityDetector {
    threshold: i64,
    buffer_seconds: f64,
    sample_rate_hz: u32,
    buffer: VecDeque<i16>,
}

impl VoiceActivityDetector {
    /// Builds a VAD with the given threshold (mean absolute INT16 amplitude)
    /// and rolling-window length.
    #[must_use]
    pub fn new(threshold: i64, buffer_seconds: f64, sample_rate_hz: u32) -> Self {
        Self {
            threshold,
            buffer_seconds,
            sample_rate_hz,
            buffer: VecDeque::new(),
        }
    }

    fn capacity(&self) -> usize {
        (self.buffer_seconds * f64::from(self.sample_rate_hz)) as usize
    }

    /// Appends `samples`, trims to the rolling window, and returns the gate state.
    pub fn update(&mut self, samples: &[i16]) -> VoiceActivity {
        self.buffer.extend(samples.iter().copied());
        let cap = self.capacity();
        while self.buffer.len() > cap {
            self.buffer.pop_front();
        }

        if self.buffer.len() < cap {
            return VoiceActivity::NotEnoughInfo;
        }

        let sum: i64 = self.buffer.iter().map(|&s| i64::from(s.unsigned_abs())).sum();
        let mean = sum / self.buffer.len() as i64;

        if mean > self.threshold {
            VoiceActivity::Speech
        } else {
            VoiceActivity::NonSpeech
        }
    }
}
