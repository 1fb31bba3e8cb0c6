//! Gateway error types.

use thiserror::Error;

/// Errors that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Message references an unregistered or already-closed session.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Operation attempted after transport teardown.
    #[error("Transport closed")]
    TransportClosed,

    /// Transport construction or engine attachment failed while opening a stream.
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    /// Registry rejected a registration because it has been drained.
    #[error("Gateway is shutting down")]
    ShuttingDown,

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Get the JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Json(_) => -32700,
            Self::Auth(_) => -32001,
            Self::SessionNotFound(_) => -32002,
            Self::TransportClosed => -32003,
            Self::ShuttingDown => -32004,
            _ => -32603,
        }
    }

    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io_error",
            Self::Json(_) => "parse_error",
            Self::SessionNotFound(_) => "session_not_found",
            Self::TransportClosed => "transport_closed",
            Self::RegistrationFailed(_) => "registration_failed",
            Self::ShuttingDown => "shutdown_in_progress",
            Self::Auth(_) => "auth_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
