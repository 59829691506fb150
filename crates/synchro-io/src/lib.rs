//! File and device input/output graph nodes for the synchro audio graph
//! engine (C6/C7/C13).
//!
//! This crate supplies the only nodes that touch the outside world through
//! a file handle or a host audio device:
//!
//! - [`wav`] - raw, format-preserving WAV read/write (bit depth and channel
//!   count survive round-trip; no implicit downmix or resampling).
//! - [`devices`] - host audio device enumeration (C13), shared by input and
//!   output device nodes.
//! - [`file_input::FileInputNode`] / [`device_input::DeviceInputNode`] - the
//!   `input_file`/`input_channel` NodeSpecs (§4.2.1/§4.2.2): bulk-read or
//!   callback-captured audio, sanitized to mono FLOAT32 before emission.
//! - [`file_output::FileOutputNode`] / [`device_output::DeviceOutputNode`] -
//!   the `output_file`/`output_channel` NodeSpecs: WAV writing and device
//!   playback.
//!
//! Device nodes never store a `cpal::Stream` on the node struct itself (it
//! is not `Send` on every backend); instead `acquire` spawns a dedicated
//! audio thread that owns the stream for its lifetime and exchanges data
//! with the node through a lock-protected buffer, per the capture/playback
//! pattern in §9's "coroutine / async callbacks" design note.

pub mod device_input;
pub mod device_output;
pub mod devices;
pub mod file_input;
pub mod file_output;
pub mod wav;

pub use device_input::DeviceInputNode;
pub use device_output::DeviceOutputNode;
pub use devices::{AudioDeviceInfo, input_device_by_index, list_devices, output_device_by_index};
pub use file_input::FileInputNode;
pub use file_output::FileOutputNode;
pub use wav::{WavInfo, read_wav_info, read_wav_raw, write_wav_raw};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// A frame's format/rate disagreed with what the node had already
    /// committed to (first-frame-wins for file/device output).
    #[error("incompatible frame format: {0}")]
    IncompatibleFormat(String),

    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("no audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
