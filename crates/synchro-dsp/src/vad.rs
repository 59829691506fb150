//! Voice-activity gate node (§4.5, §6 `vad` NodeSpec): wraps
//! [`synchro_core::VoiceActivityDetector`] as a graph processor that passes
//! buffered audio through only while the rolling window reads as speech.

use synchro_core::{Contextual, Emitter, Frame, Receiver, VoiceActivity, VoiceActivityDetector};

/// Rolling window length used by the gate, matching the default in
/// `synchro_core::VoiceActivityDetector` ADDED-note's native unit (seconds).
const BUFFER_SECONDS: f64 = 1.0;

/// Buffers incoming INT16 audio and forwards it downstream only while the
/// rolling-window mean-absolute-amplitude reads as speech; silence is
/// dropped, and an as-yet-undecided window is held back for more context.
pub struct VadGate {
    name: String,
    threshold: i64,
    vad: Option<VoiceActivityDetector>,
    buffer: Option<Frame>,
}

impl VadGate {
    /// Builds a VAD gate with the given mean-absolute-amplitude `threshold`.
    #[must_use]
    pub fn new(name: impl Into<String>, threshold: i64) -> Self {
        Self {
            name: name.into(),
            threshold,
            vad: None,
            buffer: None,
        }
    }
}

impl Contextual for VadGate {}

impl Receiver for VadGate {
    fn receive(&mut self, _source: &str, frame: Frame) {
        if frame.is_empty() {
            return;
        }
        if self.vad.is_none() {
            self.vad = Some(VoiceActivityDetector::new(self.threshold, BUFFER_SECONDS, frame.config().sample_rate_hz));
        }
        self.buffer = Some(match self.buffer.take() {
            Some(buf) => buf.append(&frame).unwrap_or(frame),
            None => frame,
        });
    }
}

impl Emitter for VadGate {
    fn emit(&mut self) -> Option<Frame> {
        let buffer = self.buffer.as_ref()?;
        let vad = self.vad.as_mut()?;

        let samples: Vec<i16> = buffer
            .payload()
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();

        match vad.update(&samples) {
            VoiceActivity::Speech => {
                let out = self.buffer.take();
                tracing::debug!(node = %self.name, "vad gate: speech, forwarding chunk");
                out
            }
            VoiceActivity::NonSpeech => {
                tracing::debug!(node = %self.name, "vad gate: non-speech, dropping chunk");
                self.buffer = None;
                None
            }
            VoiceActivity::NotEnoughInfo => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synchro_core::{AudioFormat, StreamConfig};

    fn int16_frame(samples: &[i16], rate: u32) -> Frame {
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Frame::new(StreamConfig::mono(AudioFormat::Int16, rate), payload).unwrap()
    }

    #[test]
    fn not_enough_info_holds_back_output() {
        let mut gate = VadGate::new("vad", 1000);
        gate.receive("in", int16_frame(&[5000; 10], 16000));
        assert!(gate.emit().is_none());
    }

    #[test]
    fn loud_signal_eventually_passes_through() {
        let mut gate = VadGate::new("vad", 1000);
        let loud: Vec<i16> = vec![5000; 16000 * 2];
        gate.receive("in", int16_frame(&loud, 16000));
        let out = gate.emit();
        assert!(out.is_some());
    }

    #[test]
    fn quiet_signal_is_dropped_once_window_fills() {
        let mut gate = VadGate::new("vad", 1000);
        let quiet: Vec<i16> = vec![10; 16000 * 2];
        gate.receive("in", int16_frame(&quiet, 16000));
        assert!(gate.emit().is_none());
    }
}
