//! Frame-oriented audio processors for the synchro graph engine (C8).
//!
//! Each processor implements [`synchro_core::Emitter`] and/or
//! [`synchro_core::Receiver`] and is driven by a `synchro-graph`
//! `NodeExecutor`: `receive` buffers incoming audio, `emit` runs the
//! processor's transform over whatever has accumulated and returns the
//! result. Processors never block and never talk to the outside world -
//! that's the job of `synchro-io` and `synchro-connector`.

pub mod denoiser;
pub mod measurer;
pub mod mixer;
pub mod normalizer;
pub mod resampler;
pub mod vad;
pub mod validator;
pub mod whisperprep;

pub use denoiser::Denoiser;
pub use measurer::{LevelMeter, MeterSink};
pub use mixer::Mixer;
pub use normalizer::Normalizer;
pub use resampler::Resampler;
pub use vad::VadGate;
pub use validator::FormatValidator;
pub use whisperprep::{WhisperPrep, WhisperPrepConfig, WpeStrength};
