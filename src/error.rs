//! Error types for sockjs-handler.

use std::fmt;

use thiserror::Error;

/// Boxed error accepted from user-supplied procedures and factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all handler operations.
#[derive(Debug, Error)]
pub enum SockJsError {
    /// Construction-time contract violation (missing procedure, negative setting).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The actor factory failed while building its description.
    #[error("Handler construction failed: {source}")]
    HandlerConstructionFailed {
        /// The failure raised by the factory.
        #[source]
        source: BoxError,
    },

    /// Outbound send buffer is at capacity.
    #[error("Send buffer full")]
    SendBufferFull,

    /// The transport has torn down the session.
    #[error("Session closed")]
    SessionClosed,

    /// An actor-backed session was opened outside a Tokio runtime.
    #[error("No Tokio runtime available to spawn the session actor")]
    RuntimeUnavailable,

    /// TOML settings document could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON settings document could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SockJsError {
    pub(crate) fn construction_failed(source: impl Into<BoxError>) -> Self {
        SockJsError::HandlerConstructionFailed {
            source: source.into(),
        }
    }
}

/// Result type alias using SockJsError.
pub type Result<T> = std::result::Result<T, SockJsError>;

/// Result type returned by user procedures and actors.
pub type HandlerResult = std::result::Result<(), BoxError>;

/// Panic payload marking a failure the host must never recover from.
///
/// Containment sites re-raise it untouched; any other panic is treated as an
/// ordinary handler failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unrecoverable {
    reason: String,
}

impl Unrecoverable {
    /// Create a new unrecoverable marker.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the failure is unrecoverable.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Unrecoverable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecoverable failure: {}", self.reason)
    }
}

impl std::error::Error for Unrecoverable {}

/// Abort the current handler with an [`Unrecoverable`] panic.
pub fn raise_unrecoverable(reason: impl Into<String>) -> ! {
    std::panic::panic_any(Unrecoverable::new(reason))
}

/// Error wrapping the message of a contained, non-fatal panic.
#[derive(Debug, Error)]
#[error("panic: {0}")]
pub struct PanicError(pub String);
