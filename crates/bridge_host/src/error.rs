//! Bridge error type.

use thiserror::Error;

#[derive(Debug, Error)]
/// Failures observed inside the bridge core.
///
/// Façade operations log these and degrade; only [`crate::Transport::request`] hands them to the
/// caller.
pub enum BridgeError {
    /// The backing key-value store rejected a read or write.
    #[error("storage failure: {0}")]
    Storage(String),
    /// A value could not be encoded to JSON.
    #[error("encode failure: {0}")]
    Encode(#[from] serde_json::Error),
    /// The outbound channel refused the envelope.
    #[error("outbound delivery failed: {0}")]
    Channel(String),
    /// The peer did not answer before the fallback timer fired.
    #[error("no response to `{action}` before the timeout")]
    TimedOut {
        /// Action of the unanswered request.
        action: String,
    },
    /// The pending entry was discarded without a response or a timeout.
    #[error("request `{action}` was dropped before it resolved")]
    Dropped {
        /// Action of the dropped request.
        action: String,
    },
}
