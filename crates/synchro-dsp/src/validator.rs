//! Format validator (§4.3): a pass-through processor that reinterprets
//! incoming bytes under a declared input format and re-emits them in a
//! configured target format. Sample rate is preserved end to end.

use synchro_core::format::{float32_to_pcm, pcm_to_float32};
use synchro_core::{AudioFormat, Contextual, Emitter, Frame, Receiver, StreamConfig};

/// Reinterprets/converts incoming PCM bytes to a configured target format,
/// optionally downmixing to mono first.
///
/// Unlike the input-sanitization mixin (§4.2), this is a plain graph node: it
/// trusts the declared format on each incoming frame rather than assuming a
/// fixed native format, and it does not resample.
pub struct FormatValidator {
    name: String,
    enforce_mono: bool,
    enforce_format: AudioFormat,
    passthrough_rate: bool,
    buffer: Option<Frame>,
    new_frames: usize,
}

impl FormatValidator {
    /// Builds a validator targeting `enforce_format`.
    #[must_use]
    pub fn new(name: impl Into<String>, enforce_mono: bool, enforce_format: AudioFormat, passthrough_rate: bool) -> Self {
        Self {
            name: name.into(),
            enforce_mono,
            enforce_format,
            passthrough_rate,
            buffer: None,
            new_frames: 0,
        }
    }

    fn validate_and_convert(&self, input: &Frame) -> Frame {
        let cfg = input.config();
        let channels = cfg.channels as usize;
        let samples = pcm_to_float32(cfg.audio_format, input.payload());

        let mono: Vec<f32> = if self.enforce_mono && channels > 1 {
            samples
                .chunks_exact(channels)
                .map(|c| c.iter().sum::<f32>() / channels as f32)
                .collect()
        } else {
            samples
        };

        let payload = float32_to_pcm(self.enforce_format, &mono);
        let out_channels = if self.enforce_mono { 1 } else { cfg.channels };
        let rate = if self.passthrough_rate {
            cfg.sample_rate_hz
        } else {
            cfg.sample_rate_hz
        };

        Frame::new(
            StreamConfig {
                audio_format: self.enforce_format,
                sample_rate_hz: rate,
                channels: out_channels,
                language_tag: cfg.language_tag.clone(),
            },
            payload,
        )
        .expect("float32_to_pcm always yields a whole number of samples")
    }
}

impl Contextual for FormatValidator {}

impl Receiver for FormatValidator {
    fn receive(&mut self, _source: &str, frame: Frame) {
        self.new_frames += frame.frame_count();
        self.buffer = Some(match self.buffer.take() {
            Some(buf) => buf.append(&frame).unwrap_or(frame),
            None => frame,
        });
    }
}

impl Emitter for FormatValidator {
    fn emit(&mut self) -> Option<Frame> {
        let buffer = self.buffer.as_ref()?;
        if self.new_frames == 0 {
            return None;
        }

        let tail = buffer.tail(self.new_frames);
        let out = self.validate_and_convert(&tail);

        // Keep a short trailing window for context, mirroring the other
        // chunked processors in this workspace (tail_seconds(0) drops it
        // entirely since the validator is stateless across chunks).
        self.buffer = Some(buffer.tail(0));
        self.new_frames = 0;

        tracing::debug!(node = %self.name, bytes = out.payload().len(), "validated chunk");
        Some(out)
    }
}
