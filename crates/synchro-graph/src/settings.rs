//! `Settings` (§6, C11/C12 collaborator): graph-manager pacing and run
//! limits, plus the offline quality-metric list the original source computes
//! BLEU/WER against (out of scope here - §2's Non-goals excludes reporting -
//! but the shape is carried through so `synchro-config` has somewhere to
//! load it into).

use serde::Deserialize;

fn default_input_interval_secs() -> f64 {
    0.3
}

fn default_processor_interval_secs() -> f64 {
    0.016
}

/// Top-level settings for one graph run.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub name: String,
    /// `min_step_length` (§4.12): pacing for nodes with no incoming edges.
    #[serde(default = "default_input_interval_secs")]
    pub input_interval_secs: f64,
    /// `min_step_non_generating` (§4.12): pacing for any Receiver-capable node.
    #[serde(default = "default_processor_interval_secs")]
    pub processor_interval_secs: f64,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub metrics: Metrics,
}

/// Run limits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Limits {
    /// Watchdog run length; `0` means unbounded.
    #[serde(default)]
    pub run_time_seconds: u64,
}

/// Offline quality-metric configuration (accepted, not evaluated by this
/// crate - reporting is out of scope per §2's Non-goals).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub quality: Vec<QualityMetric>,
}

/// One expected-output row for a node, used by an (out-of-scope) external
/// BLEU/WER reporter.
#[derive(Debug, Clone, Deserialize)]
pub struct QualityMetric {
    pub node: String,
    #[serde(default)]
    pub expected_transcription: Option<String>,
    #[serde(default)]
    pub expected_translation: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Global model-serving configuration threaded into `converter_seamless`
/// nodes that don't specify their own `server_url`.
#[derive(Debug, Clone, Default)]
pub struct NeuralConfig {
    pub default_server_url: Option<String>,
}
