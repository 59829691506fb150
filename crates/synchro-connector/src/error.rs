//! Error taxonomy for the translation connector (§7: ResourceError / ProtocolError).

use thiserror::Error;

/// Errors raised while connecting to, or exchanging messages with, a remote
/// translation session.
#[derive(Debug, Error)]
pub enum Error {
    /// The WebSocket connection could not be established or was dropped.
    #[error("connect to {url}: {reason}")]
    Connect {
        /// The URL the connector attempted to reach.
        url: String,
        /// Underlying transport failure, rendered as text (tungstenite's
        /// handshake error type isn't `Send`-friendly to store directly).
        reason: String,
    },

    /// A message on the wire did not match the expected envelope/payload shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `lang_to` has no entry in `LANGUAGES_MAP`.
    #[error("unsupported language {0} - add to language map if needed")]
    UnsupportedLanguage(String),
}

/// Convenience result type for connector operations.
pub type Result<T> = std::result::Result<T, Error>;
