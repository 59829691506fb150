//! File output node (C7, `output_file` NodeSpec).
//!
//! Opens a WAV writer lazily on the first received frame (so it can match
//! whatever format/rate/channel count the upstream graph settled on) and
//! writes every subsequent frame incrementally, finalizing the file when the
//! node's scoped lifecycle ends.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use hound::WavWriter;

use synchro_core::{AudioFormat, Contextual, Frame, LifecycleResult, Receiver};

use crate::wav::{create_writer, write_samples_into};

/// Writes every received frame to a WAV file, opened on first receive.
pub struct FileOutputNode {
    name: String,
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    format: Option<AudioFormat>,
    frames_written: u64,
}

impl FileOutputNode {
    /// Builds a file output node writing to `path` (with `$WORKING_DIR`
    /// already substituted by the graph builder).
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            writer: None,
            format: None,
            frames_written: 0,
        }
    }
}

impl Contextual for FileOutputNode {
    fn release(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                tracing::error!(node = %self.name, error = %e, "file output: finalize failed");
            } else {
                tracing::info!(node = %self.name, path = %self.path.display(), frames = self.frames_written, "file output: finalized");
            }
        }
    }
}

impl Receiver for FileOutputNode {
    fn receive(&mut self, _source: &str, frame: Frame) {
        if frame.is_empty() {
            return;
        }

        if self.writer.is_none() {
            match create_writer(&self.path, frame.config()) {
                Ok(writer) => {
                    self.writer = Some(writer);
                    self.format = Some(frame.config().audio_format);
                }
                Err(e) => {
                    tracing::error!(node = %self.name, error = %e, "file output: failed to open writer");
                    return;
                }
            }
        }

        let format = self.format.expect("writer is only Some once format is set");
        if frame.config().audio_format != format {
            tracing::error!(
                node = %self.name,
                expected = ?format,
                actual = ?frame.config().audio_format,
                "file output: incompatible frame format, dropping chunk"
            );
            return;
        }

        let Some(writer) = self.writer.as_mut() else { return };
        if let Err(e) = write_samples_into(writer, format, frame.payload()) {
            tracing::error!(node = %self.name, error = %e, "file output: write failed");
            return;
        }
        self.frames_written += frame.frame_count() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synchro_core::StreamConfig;
    use tempfile::NamedTempFile;

    #[test]
    fn writes_and_finalizes_on_release() {
        let file = NamedTempFile::new().unwrap();
        let mut node = FileOutputNode::new("out", file.path());
        let config = StreamConfig::mono(AudioFormat::Int16, 16000);
        let payload: Vec<u8> = (0..100i16).flat_map(|s| s.to_le_bytes()).collect();
        node.receive("in", Frame::new(config, payload).unwrap());
        node.release();

        let (read_config, read_payload) = crate::wav::read_wav_raw(file.path()).unwrap();
        assert_eq!(read_config.sample_rate_hz, 16000);
        assert_eq!(read_payload.len(), 200);
    }

    #[test]
    fn incompatible_format_is_dropped_not_fatal() {
        let file = NamedTempFile::new().unwrap();
        let mut node = FileOutputNode::new("out", file.path());
        node.receive("in", Frame::new(StreamConfig::mono(AudioFormat::Int16, 16000), vec![0, 0]).unwrap());
        node.receive("in", Frame::new(StreamConfig::mono(AudioFormat::Float32, 16000), vec![0, 0, 0, 0]).unwrap());
        node.release();
        let (read_config, _) = crate::wav::read_wav_raw(file.path()).unwrap();
        assert_eq!(read_config.audio_format, AudioFormat::Int16);
    }
}
