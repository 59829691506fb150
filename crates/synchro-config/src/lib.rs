//! Configuration loading for the graph engine (§1.1, §6).
//!
//! `synchro-config` turns a TOML file on disk into a validated
//! [`synchro_graph::GraphConfig`] + [`synchro_graph::Settings`] pair, the
//! shape the out-of-scope CLI/Hydra/TUI/agent-server collaborators described
//! in §1 are expected to hand the graph builder. It owns the `ConfigError`
//! slice of §7's taxonomy (duplicate edges, unknown node types, unknown
//! languages) and per-run working-directory resolution.
//!
//! # Example
//!
//! ```rust,no_run
//! use synchro_config::load_run_config;
//!
//! let run = load_run_config("run.toml").unwrap();
//! println!("graph has {} nodes", run.graph.nodes.len());
//! ```

mod error;

/// Per-run working directory resolution (`$WORKING_DIR`).
pub mod paths;

/// Pre-flight graph validation (no external resources touched).
pub mod validation;

pub use error::ConfigError;
pub use validation::validate;

use std::path::Path;

use serde::Deserialize;

use synchro_graph::{GraphConfig, Settings};

/// One run's full configuration: graph topology plus pacing/limits.
///
/// On the wire this is a single TOML document with a `[settings]` table and
/// top-level `nodes`/`edges` arrays (`GraphConfig`'s own shape, flattened in).
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub settings: Settings,
    #[serde(flatten)]
    pub graph: GraphConfig,
}

/// Loads and validates a [`RunConfig`] from a TOML file.
///
/// Runs [`validation::validate`] before returning, so a caller never
/// receives a graph with duplicate edges, too-short node names, or an
/// unsupported `converter_seamless` language tag (§7 `ConfigError`, fatal at
/// build).
///
/// # Errors
///
/// Returns [`ConfigError::ReadFile`] if the file cannot be read,
/// [`ConfigError::Toml`] if it does not parse, or one of the validation
/// variants if the parsed graph is structurally invalid.
pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let run: RunConfig = toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    validation::validate(&run.graph)?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_validates_a_minimal_run_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [settings]
            name = "demo"

            [[nodes]]
            name = "input"
            node_type = "input_file"
            path = "a.wav"

            [[nodes]]
            name = "output"
            node_type = "output_file"
            path = "b.wav"

            edges = [["input", "output"]]
            "#
        )
        .unwrap();

        let run = load_run_config(file.path()).unwrap();
        assert_eq!(run.settings.name, "demo");
        assert_eq!(run.graph.nodes.len(), 2);
        assert_eq!(run.graph.edges.len(), 1);
    }

    #[test]
    fn rejects_config_with_duplicate_edges() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [settings]
            name = "demo"

            [[nodes]]
            name = "input"
            node_type = "input_file"
            path = "a.wav"

            [[nodes]]
            name = "output"
            node_type = "output_file"
            path = "b.wav"

            edges = [["input", "output"], ["input", "output"]]
            "#
        )
        .unwrap();

        let err = load_run_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEdge(_, _)));
    }

    #[test]
    fn missing_file_surfaces_read_error() {
        let err = load_run_config("/nonexistent/path/run.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
