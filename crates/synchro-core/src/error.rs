//! Shared error type for the core data model.

use thiserror::Error;

/// Errors raised by Frame operations and any processor built on them.
#[derive(Debug, Error)]
pub enum Error {
    /// Two frames (or a frame and a target format) disagree on
    /// `(audio_format, sample_rate_hz, channels)`.
    #[error(
        "incompatible frame format in {context}: expected {expected}, got {actual}"
    )]
    IncompatibleFormat {
        /// Where the mismatch was detected (node name, operation).
        context: String,
        /// Human-readable description of the expected format.
        expected: String,
        /// Human-readable description of the actual format.
        actual: String,
    },

    /// A frame's payload length is not a multiple of `sample_size_bytes * channels`.
    #[error("malformed frame: payload length {payload_len} is not a multiple of {unit_bytes}")]
    Malformed {
        /// Length in bytes of the offending payload.
        payload_len: usize,
        /// `sample_size_bytes * channels` it should be a multiple of.
        unit_bytes: usize,
    },
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
