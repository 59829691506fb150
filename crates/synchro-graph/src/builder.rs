//! The graph builder (C10, §4.11): a pure function dispatching each
//! `NodeSpec` to its concrete constructor and validating edges.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use synchro_core::{Contextual as _, Emitter as _, EventBus, NodeCapabilities, Receiver as _};
use synchro_connector::SeamlessConnector;
use synchro_dsp::{Denoiser, FormatValidator, LevelMeter, Mixer, Normalizer, Resampler, VadGate, WhisperPrep, WhisperPrepConfig};
use synchro_io::{DeviceInputNode, DeviceOutputNode, FileInputNode, FileOutputNode};

use crate::error::{Error, Result};
use crate::node::{EmitterOnly, EmitterReceiver, GraphNode, ReceiverOnly};
use crate::settings::{NeuralConfig, Settings};
use crate::spec::{GraphConfig, NodeSpec};

/// One built node plus which capabilities it advertises, keyed by name.
pub type NodeTable = HashMap<String, Box<dyn GraphNode>>;

/// Validated edge list: `(source_name, target_name)` pairs, deduplicated and
/// endpoint-checked.
pub type EdgeList = Vec<(String, String)>;

/// Materializes a [`GraphConfig`] into concrete nodes and validated edges.
///
/// Dispatches each `NodeSpec` by its `node_type` tag (§6); does not verify
/// edge format compatibility beyond endpoint existence and capability shape
/// - a resampler wired to the wrong rate, for instance, fails at runtime on
/// its first frame with `IncompatibleFormat`, not here.
pub fn build(
    graph: &GraphConfig,
    _settings: &Settings,
    neural: &NeuralConfig,
    events: &EventBus,
    working_dir: &Path,
) -> Result<(NodeTable, EdgeList)> {
    let mut nodes: NodeTable = HashMap::new();

    for entry in &graph.nodes {
        let node = build_node(&entry.name, &entry.spec, neural, events, working_dir)?;
        nodes.insert(entry.name.clone(), node);
    }

    let mut seen = HashSet::new();
    let mut edges = Vec::with_capacity(graph.edges.len());
    for (source, target) in &graph.edges {
        if !seen.insert((source.clone(), target.clone())) {
            return Err(Error::DuplicateEdge(source.clone(), target.clone()));
        }

        let source_caps = nodes.get(source).map(|n| n.capabilities()).ok_or_else(|| Error::UnknownEndpoint(source.clone()))?;
        let target_caps = nodes.get(target).map(|n| n.capabilities()).ok_or_else(|| Error::UnknownEndpoint(target.clone()))?;

        if !source_caps.emits {
            return Err(Error::IncompatibleEdge(source.clone(), target.clone(), format!("{source} has no Emitter capability")));
        }
        if !target_caps.receives {
            return Err(Error::IncompatibleEdge(source.clone(), target.clone(), format!("{target} has no Receiver capability")));
        }

        edges.push((source.clone(), target.clone()));
    }

    Ok((nodes, edges))
}

fn substitute_working_dir(path: &std::path::Path, working_dir: &Path) -> std::path::PathBuf {
    let raw = path.to_string_lossy();
    if raw.contains("$WORKING_DIR") {
        std::path::PathBuf::from(raw.replace("$WORKING_DIR", &working_dir.to_string_lossy()))
    } else {
        path.to_path_buf()
    }
}

fn build_node(name: &str, spec: &NodeSpec, neural: &NeuralConfig, events: &EventBus, working_dir: &Path) -> Result<Box<dyn GraphNode>> {
    let node: Box<dyn GraphNode> = match spec.clone() {
        NodeSpec::InputChannel { device, channel } => Box::new(EmitterOnly(DeviceInputNode::new(name, device, channel))),

        NodeSpec::InputFile {
            path,
            looping,
            delay,
            start,
            duration,
            channels: _,
            enforce_float32,
            mono_strategy,
            select_channel_index,
        } => Box::new(EmitterOnly(FileInputNode::new(
            name,
            path,
            looping,
            delay,
            mono_strategy.resolve(select_channel_index),
            enforce_float32,
            start,
            duration,
        ))),

        NodeSpec::OutputChannel { device, channel } => Box::new(ReceiverOnly(DeviceOutputNode::new(name, device, channel))),

        NodeSpec::OutputFile { path } => {
            let resolved = substitute_working_dir(&path, working_dir);
            Box::new(ReceiverOnly(FileOutputNode::new(name, resolved)))
        }

        NodeSpec::ConverterSeamless { server_url, lang_from, lang_to } => {
            let url = if server_url.is_empty() {
                neural.default_server_url.clone().unwrap_or(server_url)
            } else {
                server_url
            };
            let connector = SeamlessConnector::new(name, url, lang_from, lang_to).with_events(events.clone());
            Box::new(EmitterReceiver(connector))
        }

        NodeSpec::Mixer { min_working_step_length_secs } => Box::new(EmitterReceiver(Mixer::new(name, min_working_step_length_secs))),

        NodeSpec::Resampler { to_rate } => Box::new(EmitterReceiver(Resampler::new(name, to_rate).with_events(events.clone()))),

        NodeSpec::Vad { threshold } => Box::new(EmitterReceiver(VadGate::new(name, threshold))),

        NodeSpec::Normalizer { headroom } => Box::new(EmitterReceiver(Normalizer::new(name, headroom))),

        NodeSpec::Denoiser { threshold } => Box::new(EmitterReceiver(Denoiser::new(name, threshold as f32))),

        NodeSpec::Validator {
            enforce_mono,
            enforce_format,
            passthrough_rate,
        } => Box::new(EmitterReceiver(FormatValidator::new(name, enforce_mono, enforce_format.into(), passthrough_rate))),

        NodeSpec::Preparer {
            min_buffer_sec,
            keep_context_sec,
            enable_wpe,
            enable_normalize,
            enable_limiter,
            enable_filters,
            headroom_db,
            true_peak_dbfs,
            hpf_hz,
            lpf_ratio_to_nyquist,
            filter_order,
            require_float32: _,
            wpe_strength,
        } => {
            let config = WhisperPrepConfig {
                min_buffer_sec,
                keep_context_sec,
                enable_wpe,
                enable_normalize,
                enable_limiter,
                enable_filters,
                headroom_db,
                true_peak_dbfs,
                hpf_hz,
                lpf_ratio_to_nyquist,
                filter_order,
                wpe_strength: wpe_strength.0,
            };
            Box::new(EmitterReceiver(WhisperPrep::new(name, config)))
        }

        NodeSpec::Measurer {
            refresh_hz,
            window_seconds,
            bar_height,
            clip_threshold_float,
            sink,
        } => Box::new(ReceiverOnly(LevelMeter::new(name, refresh_hz, window_seconds, bar_height, clip_threshold_float, sink.resolve()))),
    };
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::NodeEntry;

    fn settings() -> Settings {
        Settings {
            name: "test".to_string(),
            input_interval_secs: 0.3,
            processor_interval_secs: 0.016,
            limits: crate::settings::Limits::default(),
            metrics: crate::settings::Metrics::default(),
        }
    }

    #[test]
    fn rejects_duplicate_edges() {
        let cfg = GraphConfig {
            nodes: vec![
                NodeEntry {
                    name: "a".to_string(),
                    spec: NodeSpec::InputFile {
                        path: "x.wav".into(),
                        looping: false,
                        delay: 0.0,
                        start: 0,
                        duration: None,
                        channels: None,
                        enforce_float32: true,
                        mono_strategy: crate::spec::MonoStrategySpec::Mean,
                        select_channel_index: 0,
                    },
                },
                NodeEntry {
                    name: "b".to_string(),
                    spec: NodeSpec::OutputFile { path: "y.wav".into() },
                },
            ],
            edges: vec![("a".to_string(), "b".to_string()), ("a".to_string(), "b".to_string())],
        };
        let events = EventBus::new();
        let result = build(&cfg, &settings(), &NeuralConfig::default(), &events, Path::new("."));
        assert!(matches!(result, Err(Error::DuplicateEdge(_, _))));
    }

    #[test]
    fn rejects_unknown_endpoint() {
        let cfg = GraphConfig {
            nodes: vec![NodeEntry {
                name: "a".to_string(),
                spec: NodeSpec::OutputFile { path: "y.wav".into() },
            }],
            edges: vec![("missing".to_string(), "a".to_string())],
        };
        let events = EventBus::new();
        let result = build(&cfg, &settings(), &NeuralConfig::default(), &events, Path::new("."));
        assert!(matches!(result, Err(Error::UnknownEndpoint(_))));
    }

    #[test]
    fn working_dir_is_substituted_in_output_path() {
        let cfg = GraphConfig {
            nodes: vec![NodeEntry {
                name: "out".to_string(),
                spec: NodeSpec::OutputFile {
                    path: "$WORKING_DIR/take.wav".into(),
                },
            }],
            edges: vec![],
        };
        let events = EventBus::new();
        let (nodes, _) = build(&cfg, &settings(), &NeuralConfig::default(), &events, Path::new("/tmp/run1")).unwrap();
        assert_eq!(nodes.len(), 1);
    }
}
