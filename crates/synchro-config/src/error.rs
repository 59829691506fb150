//! Configuration error taxonomy (§7 `ConfigError`, concrete mapping).

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a [`crate::RunConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse TOML in '{path}': {source}")]
    Toml {
        /// Path of the file that failed to parse.
        path: PathBuf,
        /// Underlying parser error.
        #[source]
        source: toml::de::Error,
    },

    /// Same `(source, target)` edge named more than once.
    #[error("duplicate edge: {0} -> {1}")]
    DuplicateEdge(String, String),

    /// An edge names a node absent from `nodes`.
    #[error("edge references unknown node: {0}")]
    UnknownEndpoint(String),

    /// A node name is shorter than §3's `len(name) >= 3` invariant.
    #[error("node name '{0}' is shorter than the minimum length of 3")]
    NodeNameTooShort(String),

    /// Two nodes share a name.
    #[error("duplicate node name: {0}")]
    DuplicateNodeName(String),

    /// `converter_seamless.lang_to` has no entry in the connector's language map.
    #[error("unknown language tag: {0}")]
    UnknownLanguage(String),
}

/// Convenience result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
