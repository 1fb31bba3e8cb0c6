//! Streaming gateway for the Fleetgate device-management API.
//!
//! This crate provides:
//! - A session registry mapping session identity to live transports
//! - Stream transports carrying one session's outbound frame sequence
//! - An HTTP binder (SSE out, JSON POST in) multiplexing many sessions
//! - A shutdown coordinator guaranteeing deterministic teardown
//! - The tool-dispatch and request-executor contracts to its collaborators

pub mod engine;
pub mod error;
pub mod executor;
pub mod registry;
pub mod rpc;
pub mod server;
pub mod shutdown;
pub mod tools;
pub mod transport;

pub use engine::{ProtocolEngine, ToolEngine};
pub use error::GatewayError;
pub use executor::{HttpExecutor, RequestExecutor};
pub use registry::SessionRegistry;
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::{Gateway, GatewayConfig};
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
pub use tools::{ToolHandler, ToolRegistry};
pub use transport::{Frame, StreamTransport, TransportState};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
