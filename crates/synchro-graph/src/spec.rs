//! Declarative graph configuration types (C10, §6 "Graph config").
//!
//! `GraphConfig` is the wire/file shape a `synchro-config` loader
//! deserializes from TOML; `NodeSpec` is a closed tagged sum type dispatched
//! by [`crate::builder::build`] to a concrete node constructor.

use std::path::PathBuf;

use serde::Deserialize;

use synchro_core::{AudioFormat, MonoStrategy};
use synchro_dsp::{MeterSink, WpeStrength};

/// A declarative graph: named nodes plus the edges wiring them together.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub nodes: Vec<NodeEntry>,
    pub edges: Vec<(String, String)>,
}

/// One named node: `name` plus a `node_type`-tagged [`NodeSpec`].
#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntry {
    /// Unique node name (§3: `len(name) >= 3`).
    pub name: String,
    #[serde(flatten)]
    pub spec: NodeSpec,
}

/// Mono-downmix strategy as carried on the wire (§6 `input_file.mono_strategy`).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonoStrategySpec {
    Mean,
    Select,
}

impl MonoStrategySpec {
    #[must_use]
    pub fn resolve(self, select_channel_index: usize) -> MonoStrategy {
        match self {
            MonoStrategySpec::Mean => MonoStrategy::Mean,
            MonoStrategySpec::Select => MonoStrategy::Select(select_channel_index),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_channel() -> usize {
    1
}

fn default_mono_strategy() -> MonoStrategySpec {
    MonoStrategySpec::Mean
}

fn default_mixer_step() -> f64 {
    1.0
}

fn default_vad_threshold() -> i64 {
    1000
}

fn default_normalizer_headroom() -> f64 {
    10.0
}

fn default_denoiser_threshold() -> f64 {
    0.5
}

fn default_min_buffer_sec() -> f64 {
    0.5
}

fn default_keep_context_sec() -> f64 {
    1.0
}

fn default_headroom_db() -> f64 {
    10.0
}

fn default_true_peak_dbfs() -> f64 {
    -1.8
}

fn default_hpf_hz() -> Option<f64> {
    Some(65.0)
}

fn default_lpf_ratio() -> f64 {
    0.975
}

fn default_filter_order() -> usize {
    4
}

fn default_wpe_strength() -> WpeStrength {
    WpeStrength::Strong
}

impl<'de> Deserialize<'de> for WpeStrengthWire {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let strength = match s.as_str() {
            "mild" => WpeStrength::Mild,
            "strong" => WpeStrength::Strong,
            "extreme" => WpeStrength::Extreme,
            other => {
                return Err(serde::de::Error::custom(format!("unknown wpe_strength: {other}")));
            }
        };
        Ok(WpeStrengthWire(strength))
    }
}

/// Newtype so [`WpeStrength`] (defined in `synchro-dsp`, no `Deserialize`
/// impl of its own) can be used as a `NodeSpec` field via `#[serde(from)]`-style
/// manual delegation.
#[derive(Debug, Clone, Copy)]
pub struct WpeStrengthWire(pub WpeStrength);

/// `AudioFormat` on the wire, as a lowercase tag (`AudioFormat` itself has no
/// `Deserialize` impl in `synchro-core`, which carries no `serde` dependency).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormatSpec {
    Int8,
    Int16,
    Int24,
    Int32,
    Float32,
}

impl From<AudioFormatSpec> for AudioFormat {
    fn from(spec: AudioFormatSpec) -> Self {
        match spec {
            AudioFormatSpec::Int8 => AudioFormat::Int8,
            AudioFormatSpec::Int16 => AudioFormat::Int16,
            AudioFormatSpec::Int24 => AudioFormat::Int24,
            AudioFormatSpec::Int32 => AudioFormat::Int32,
            AudioFormatSpec::Float32 => AudioFormat::Float32,
        }
    }
}

/// `measurer.sink` on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MeterSinkSpec {
    Stdout,
    Stderr,
    File { path: PathBuf },
}

impl MeterSinkSpec {
    #[must_use]
    pub fn resolve(self) -> MeterSink {
        match self {
            MeterSinkSpec::Stdout => MeterSink::Stdout,
            MeterSinkSpec::Stderr => MeterSink::Stderr,
            MeterSinkSpec::File { path } => MeterSink::File(path),
        }
    }
}

/// The closed set of node kinds (§6), tagged by `node_type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum NodeSpec {
    InputChannel {
        device: i64,
        #[serde(default = "default_channel")]
        channel: usize,
    },
    InputFile {
        path: PathBuf,
        #[serde(default = "default_true")]
        looping: bool,
        #[serde(default)]
        delay: f64,
        #[serde(default)]
        start: u64,
        #[serde(default)]
        duration: Option<u64>,
        /// Accepted for schema parity with the original source; file inputs
        /// infer channel count from the WAV header instead of trusting a
        /// declared value (reserved, like `start`/`duration`).
        #[serde(default)]
        channels: Option<u16>,
        #[serde(default = "default_true")]
        enforce_float32: bool,
        #[serde(default = "default_mono_strategy")]
        mono_strategy: MonoStrategySpec,
        #[serde(default)]
        select_channel_index: usize,
    },
    OutputChannel {
        device: i64,
        #[serde(default = "default_channel")]
        channel: usize,
    },
    OutputFile {
        path: PathBuf,
    },
    ConverterSeamless {
        server_url: String,
        lang_from: String,
        lang_to: String,
    },
    Mixer {
        #[serde(default = "default_mixer_step")]
        min_working_step_length_secs: f64,
    },
    Resampler {
        to_rate: u32,
    },
    Vad {
        #[serde(default = "default_vad_threshold")]
        threshold: i64,
    },
    Normalizer {
        #[serde(default = "default_normalizer_headroom")]
        headroom: f64,
    },
    Denoiser {
        #[serde(default = "default_denoiser_threshold")]
        threshold: f64,
    },
    Validator {
        #[serde(default = "default_true")]
        enforce_mono: bool,
        enforce_format: AudioFormatSpec,
        #[serde(default = "default_true")]
        passthrough_rate: bool,
    },
    Preparer {
        #[serde(default = "default_min_buffer_sec")]
        min_buffer_sec: f64,
        #[serde(default = "default_keep_context_sec")]
        keep_context_sec: f64,
        #[serde(default = "default_true")]
        enable_wpe: bool,
        #[serde(default = "default_true")]
        enable_normalize: bool,
        #[serde(default = "default_true")]
        enable_limiter: bool,
        #[serde(default = "default_true")]
        enable_filters: bool,
        #[serde(default = "default_headroom_db")]
        headroom_db: f64,
        #[serde(default = "default_true_peak_dbfs")]
        true_peak_dbfs: f64,
        #[serde(default = "default_hpf_hz")]
        hpf_hz: Option<f64>,
        #[serde(default = "default_lpf_ratio")]
        lpf_ratio_to_nyquist: f64,
        #[serde(default = "default_filter_order")]
        filter_order: usize,
        /// Accepted for schema parity; `WhisperPrep::receive` always
        /// requires FLOAT32 mono input today regardless of this flag
        /// (reserved, see DESIGN.md).
        #[serde(default = "default_true")]
        require_float32: bool,
        #[serde(default = "wpe_strength_default")]
        wpe_strength: WpeStrengthWire,
    },
    Measurer {
        refresh_hz: f64,
        window_seconds: f64,
        bar_height: usize,
        clip_threshold_float: f32,
        sink: MeterSinkSpec,
    },
}

fn wpe_strength_default() -> WpeStrengthWire {
    WpeStrengthWire(default_wpe_strength())
}
