//! The translation connector node (C9).
//!
//! `synchro-connector` is the one crate in this workspace that talks to the
//! outside world over a network protocol instead of a device or file handle:
//! [`SeamlessConnector`] holds a long-lived WebSocket session to a remote
//! streaming translation model, translating Frames in one language into
//! Frames in another.

pub mod connector;
pub mod error;
pub mod languages;

pub use connector::{ConnectorState, SeamlessConnector};
pub use error::{Error, Result};
