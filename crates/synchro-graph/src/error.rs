//! Graph-build and graph-run error taxonomy (§7's `ConfigError`/`ResourceError`,
//! the slice of it this crate itself detects).

/// Errors raised while materializing or running a graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An edge names a node that is not in the `nodes` list.
    #[error("edge references unknown node: {0}")]
    UnknownEndpoint(String),

    /// The same `(source, target)` edge appears more than once.
    #[error("duplicate edge: {0} -> {1}")]
    DuplicateEdge(String, String),

    /// An edge targets a node with no `Receiver` capability, or originates
    /// from a node with no `Emitter` capability.
    #[error("edge {0} -> {1} is incompatible with {2}'s capabilities")]
    IncompatibleEdge(String, String, String),

    /// A node's `acquire` failed; the graph manager isolates this to the one
    /// node rather than failing the whole run.
    #[error("node '{0}' failed to acquire: {1}")]
    AcquireFailed(String, String),

    /// Building a concrete node from its `NodeSpec` failed (e.g. a resampler
    /// whose `to_rate` cannot be determined to differ from its source yet).
    #[error("failed to build node '{0}': {1}")]
    BuildFailed(String, String),

    /// A second `execute()` call landed on a manager that is already running
    /// or has already run; a graph executes exactly once per manager.
    #[error("graph is already executing")]
    AlreadyExecuting,
}

/// Convenience result type for graph construction and execution.
pub type Result<T> = std::result::Result<T, Error>;
