//! Protocol engine: consumes inbound messages, produces outbound frames.

use crate::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::tools::ToolRegistry;
use crate::transport::{Frame, StreamTransport};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// The collaborator that interprets inbound messages for a transport.
///
/// The core hands each transport to the engine once (`attach`) and then
/// forwards inbound messages one at a time (`handle`); the engine owns
/// request/response correlation and writes frames back through the
/// transport's `send`.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Take over a newly opened transport's outbound side.
    async fn attach(&self, transport: Arc<StreamTransport>) -> Result<()>;

    /// Process one inbound message for the given transport.
    async fn handle(&self, transport: &StreamTransport, request: JsonRpcRequest) -> Result<()>;
}

/// JSON-RPC engine dispatching over a tool table.
pub struct ToolEngine {
    tools: Arc<ToolRegistry>,
}

impl ToolEngine {
    /// Create an engine over the given tool table.
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    /// Access the tool table, e.g. to register additional tools.
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }
}

#[async_trait]
impl ProtocolEngine for ToolEngine {
    async fn attach(&self, transport: Arc<StreamTransport>) -> Result<()> {
        // The first frame carries the session identity to the client.
        transport.send(Frame::endpoint(transport.session_id()))
    }

    async fn handle(&self, transport: &StreamTransport, request: JsonRpcRequest) -> Result<()> {
        let result = self.tools.call(&request.method, request.params.clone()).await;

        if request.is_notification() {
            // Notifications get no response frame.
            if let Err(e) = result {
                debug!(tool = %request.method, error = %e, "notification dispatch failed");
            }
            return Ok(());
        }

        let response = match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => JsonRpcResponse::error(request.id, JsonRpcError::new(e.code(), e.to_string())),
        };

        transport.send(Frame::message(&serde_json::to_value(&response)?))
    }
}
