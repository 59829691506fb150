//! Synchro Core - shared audio data model and DSP primitives
//!
//! This crate defines the common currency the rest of the workspace builds
//! on: the [`Frame`]/[`StreamConfig`] audio-chunk model, the [`Contextual`]/
//! [`Emitter`]/[`Receiver`] node capability traits, and a handful of
//! processing primitives ([`VoiceActivityDetector`], [`wpe::OnlineWpe`],
//! [`Biquad`]) shared by nodes in `synchro-dsp`, `synchro-io`, and
//! `synchro-connector`. It also carries the cross-cutting [`EventBus`] used
//! by the graph manager for lifecycle and diagnostic events.
//!
//! # Core Abstractions
//!
//! - [`Frame`] / [`StreamConfig`] / [`format::AudioFormat`] - the audio chunk
//!   carrier and its stream-shape metadata (§4.1).
//! - [`Contextual`] / [`Emitter`] / [`Receiver`] / [`NodeCapabilities`] - node
//!   capability traits (§4.5 of the workspace design).
//! - [`VoiceActivityDetector`] - rolling energy-threshold VAD.
//! - [`wpe::OnlineWpe`] - per-bin online WPE dereverberation.
//! - [`Biquad`] - second-order IIR filter with RBJ cookbook coefficients,
//!   reused by the WhisperPrep chain's zero-phase HPF/LPF stages.
//! - [`EventBus`] - synchronous, best-effort fan-out event publisher.

pub mod biquad;
pub mod error;
pub mod events;
pub mod fast_math;
pub mod format;
pub mod frame;
pub mod math;
pub mod traits;
pub mod vad;
pub mod wpe;

pub use biquad::{
    Biquad, bandpass_coefficients, highpass_coefficients, lowpass_coefficients, notch_coefficients,
    peaking_eq_coefficients,
};
pub use error::{Error, Result};
pub use events::{Event, EventBus};
pub use fast_math::{fast_db_to_linear, fast_exp2, fast_linear_to_db, fast_log2, fast_sin_turns, fast_tan};
pub use format::AudioFormat;
pub use frame::{Frame, MonoStrategy, StreamConfig};
pub use math::{
    clamp, db_to_linear, fast_tanh, flush_denormal, lerp, linear_to_db, soft_clip, soft_limit,
    wet_dry_mix,
};
pub use traits::{Contextual, Emitter, LifecycleResult, NodeCapabilities, Receiver};
pub use vad::{VoiceActivity, VoiceActivityDetector};
pub use wpe::OnlineWpe;
