//! Pre-flight graph validation (§4.11, §7 `ConfigError`).
//!
//! Mirrors the subset of checks [`synchro_graph::builder::build`] performs
//! itself, but without touching any external resource (no file opens, no
//! device handles, no network connects) - this is what the `validate` CLI
//! subcommand runs before `run` actually materializes nodes.

use std::collections::HashSet;

use synchro_graph::{GraphConfig, NodeSpec};

use crate::error::{ConfigError, Result};

/// Minimum node name length (§3).
const MIN_NODE_NAME_LEN: usize = 3;

/// Validates node names, edge endpoints/duplicates, and `converter_seamless`
/// language tags, without constructing any node.
pub fn validate(graph: &GraphConfig) -> Result<()> {
    let mut names = HashSet::new();
    for entry in &graph.nodes {
        if entry.name.len() < MIN_NODE_NAME_LEN {
            return Err(ConfigError::NodeNameTooShort(entry.name.clone()));
        }
        if !names.insert(entry.name.clone()) {
            return Err(ConfigError::DuplicateNodeName(entry.name.clone()));
        }
        if let NodeSpec::ConverterSeamless { lang_to, .. } = &entry.spec {
            if synchro_connector::languages::to_remote_tag(lang_to).is_none() {
                return Err(ConfigError::UnknownLanguage(lang_to.clone()));
            }
        }
    }

    let mut seen_edges = HashSet::new();
    for (source, target) in &graph.edges {
        if !seen_edges.insert((source.clone(), target.clone())) {
            return Err(ConfigError::DuplicateEdge(source.clone(), target.clone()));
        }
        if !names.contains(source) {
            return Err(ConfigError::UnknownEndpoint(source.clone()));
        }
        if !names.contains(target) {
            return Err(ConfigError::UnknownEndpoint(target.clone()));
        }
    }

    Ok(())
}
