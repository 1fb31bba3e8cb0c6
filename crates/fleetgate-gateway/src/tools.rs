//! Tool dispatch table and builtin tools.
//!
//! The per-endpoint glue that makes up most of a deployed gateway lives
//! behind this table; the core only depends on the `(name, params) ->
//! result | typed error` contract. `RemoteToolHandler` is the one exemplar
//! bridging a remote endpoint through the request executor.

use crate::executor::{ExecutorError, RequestExecutor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Typed errors from tool dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Get the JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound(_) => -32601,
            Self::InvalidArgument(_) => -32602,
            Self::Internal(_) => -32603,
        }
    }
}

impl From<ExecutorError> for DispatchError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::NotFound(msg) => Self::NotFound(msg),
            ExecutorError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            ExecutorError::Unavailable(msg) | ExecutorError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// Trait for tool handlers.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Handle the tool call.
    async fn call(&self, params: Option<serde_json::Value>)
        -> Result<serde_json::Value, DispatchError>;
}

/// Registry mapping tool names to handlers.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool handler.
    pub async fn register(&self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let mut tools = self.tools.write().await;
        tools.insert(name.into(), handler);
    }

    /// Dispatch a tool call.
    pub async fn call(
        &self,
        name: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, DispatchError> {
        let handler = {
            let tools = self.tools.read().await;
            tools
                .get(name)
                .cloned()
                .ok_or_else(|| DispatchError::NotFound(name.to_string()))?
        };

        debug!(tool = %name, "dispatching tool");
        handler.call(params).await
    }

    /// List registered tool names.
    pub async fn list(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }
}

// Builtin tool handlers

/// No-op tool, useful for connectivity checks.
pub struct NoopTool;

#[async_trait]
impl ToolHandler for NoopTool {
    async fn call(
        &self,
        _params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, DispatchError> {
        Ok(serde_json::json!({ "ok": true }))
    }
}

/// Ping tool.
pub struct PingTool;

#[async_trait]
impl ToolHandler for PingTool {
    async fn call(
        &self,
        _params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, DispatchError> {
        Ok(serde_json::json!({
            "pong": true,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

/// Echo tool: returns its parameters unchanged.
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, DispatchError> {
        Ok(params.unwrap_or(serde_json::Value::Null))
    }
}

/// Gateway info tool.
pub struct GatewayInfoTool;

#[async_trait]
impl ToolHandler for GatewayInfoTool {
    async fn call(
        &self,
        _params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, DispatchError> {
        Ok(serde_json::json!({
            "name": "fleetgate",
            "version": env!("CARGO_PKG_VERSION"),
            "platform": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }))
    }
}

/// Lists the registered tools.
pub struct ListToolsTool {
    registry: Arc<ToolRegistry>,
}

impl ListToolsTool {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ToolHandler for ListToolsTool {
    async fn call(
        &self,
        _params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, DispatchError> {
        let tools = self.registry.list().await;
        Ok(serde_json::json!({ "tools": tools }))
    }
}

/// Bridges one remote API endpoint into the tool table.
///
/// The tool's parameters are passed straight through to the executor; the
/// remote API owns validation and filtering.
pub struct RemoteToolHandler {
    executor: Arc<dyn RequestExecutor>,
    method: String,
    path: String,
}

impl RemoteToolHandler {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            method: method.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for RemoteToolHandler {
    async fn call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, DispatchError> {
        let result = self.executor.execute(&self.method, &self.path, params).await?;
        Ok(result)
    }
}

/// Register the builtin tools.
pub async fn register_builtin(registry: &Arc<ToolRegistry>) {
    registry.register("noop", Arc::new(NoopTool)).await;
    registry.register("ping", Arc::new(PingTool)).await;
    registry.register("echo", Arc::new(EchoTool)).await;
    registry
        .register("gateway.info", Arc::new(GatewayInfoTool))
        .await;
    registry
        .register("tools.list", Arc::new(ListToolsTool::new(registry.clone())))
        .await;
}
