//! Node capability traits (C5).
//!
//! Modeled as small, independent, combinable traits rather than a base-class
//! hierarchy: a concrete node implements any non-empty subset. The graph
//! executor (`synchro-graph`) is written once over these capabilities using
//! `downcast`-free trait-object checks (each node advertises which
//! capabilities it has via [`NodeCapabilities`]).

use crate::frame::Frame;

/// Result of an `acquire`/`release` lifecycle call.
pub type LifecycleResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Scoped external-resource lifecycle (device handles, open files, sockets).
///
/// Every node implements this; nodes with nothing to acquire use the default
/// no-op implementations.
pub trait Contextual {
    /// Acquires external resources. Called once before the executor loop starts.
    fn acquire(&mut self) -> LifecycleResult {
        Ok(())
    }

    /// Releases external resources. Called once after the executor loop stops,
    /// even if `acquire` failed partway through.
    fn release(&mut self) {}
}

/// A node that produces Frames.
pub trait Emitter: Contextual {
    /// Produces the next Frame, or `None` if no data is available yet
    /// (a transient condition, not an error).
    fn emit(&mut self) -> Option<Frame>;
}

/// A node that consumes Frames from any number of incoming edges.
pub trait Receiver: Contextual {
    /// Consumes a Frame arriving from `source` (the upstream node's name).
    fn receive(&mut self, source: &str, frame: Frame);
}

/// Bitset-style summary of which capabilities a boxed node exposes, used by
/// the graph manager to decide whether to call `emit`/`receive` and which
/// poll interval to use (§4.12: any Receiver, even a dual-capability one,
/// uses the fast poll interval).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCapabilities {
    /// Node implements [`Emitter`].
    pub emits: bool,
    /// Node implements [`Receiver`].
    pub receives: bool,
}

impl NodeCapabilities {
    /// Both capabilities.
    #[must_use]
    pub const fn both() -> Self {
        Self {
            emits: true,
            receives: true,
        }
    }

    /// Emitter only (source nodes: file/device input).
    #[must_use]
    pub const fn emitter_only() -> Self {
        Self {
            emits: true,
            receives: false,
        }
    }

    /// Receiver only (sink nodes: file/device output).
    #[must_use]
    pub const fn receiver_only() -> Self {
        Self {
            emits: false,
            receives: true,
        }
    }
}
