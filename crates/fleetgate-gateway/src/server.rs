//! HTTP transport binder.
//!
//! Binds the wire protocol (SSE + JSON POST) to the transport layer:
//! `GET /stream` opens a session's outbound channel, `POST
//! /message/{session_id}` submits one inbound message, `DELETE
//! /stream/{session_id}` closes a session from the client side.

use crate::engine::{ProtocolEngine, ToolEngine};
use crate::error::GatewayError;
use crate::registry::SessionRegistry;
use crate::rpc::JsonRpcRequest;
use crate::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::tools::{register_builtin, ToolRegistry};
use crate::transport::StreamTransport;
use crate::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures::StreamExt;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, error, info, warn};

pub use fleetgate_core::config::{BindMode, GatewaySection as GatewayConfig};

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 18790;

/// Allowed origins for CORS.
const ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://127.0.0.1",
    "https://localhost",
    "https://127.0.0.1",
];

/// SSE keep-alive interval.
const KEEP_ALIVE_SECS: u64 = 15;

/// Gateway server state.
pub struct GatewayState {
    /// Session registry: the only shared mutable state in the core.
    pub registry: Arc<SessionRegistry>,

    /// Protocol engine attached to every new transport.
    pub engine: Arc<dyn ProtocolEngine>,

    /// Configuration.
    pub config: GatewayConfig,
}

impl GatewayState {
    /// Validate the bearer token for non-loopback binds.
    fn authenticate(&self, headers: &HeaderMap) -> Result<()> {
        if self.config.bind == BindMode::Loopback {
            // Loopback connections are implicitly trusted.
            return Ok(());
        }

        let Some(expected) = &self.config.auth_token else {
            return Ok(());
        };

        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "));

        match token {
            Some(token) if token == expected => Ok(()),
            _ => Err(GatewayError::Auth(
                "Invalid or missing bearer token".to_string(),
            )),
        }
    }
}

/// The streaming gateway server.
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a gateway with an explicit protocol engine.
    pub fn new(config: GatewayConfig, engine: Arc<dyn ProtocolEngine>) -> Self {
        let state = Arc::new(GatewayState {
            registry: Arc::new(SessionRegistry::with_limit(config.max_sessions)),
            engine,
            config,
        });
        Self { state }
    }

    /// Create a gateway wired to a tool engine with the builtin tools.
    pub async fn with_builtin_tools(config: GatewayConfig) -> Self {
        let tools = Arc::new(ToolRegistry::new());
        register_builtin(&tools).await;
        Self::new(config, Arc::new(ToolEngine::new(tools)))
    }

    /// The session registry.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.state.registry.clone()
    }

    /// Create the axum router.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/stream", get(open_stream))
            .route("/stream/:session_id", delete(close_stream))
            .route("/message/:session_id", post(submit_message))
            .route("/health", get(health))
            .with_state(self.state.clone());

        if self.state.config.cors {
            router = router.layer(cors_layer());
        }

        router
    }

    /// Run the gateway until `shutdown` resolves, then drain every session
    /// and stop the listener. The returned report says whether the sweep
    /// was clean; callers turn a dirty sweep into a non-zero exit code.
    pub async fn run<F>(&self, shutdown: F) -> Result<ShutdownReport>
    where
        F: Future<Output = ()>,
    {
        if self.state.config.bind != BindMode::Loopback {
            warn!("gateway binding beyond loopback; network clients can reach it");
            if self.state.config.auth_token.is_none() {
                warn!("no auth token configured for non-loopback bind");
            }
        }

        let addr = self.bind_address();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(GatewayError::Io)?;
        info!("gateway listening on {}", addr);

        let app = self.router();
        let reaper = self.spawn_idle_reaper();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await
        });

        shutdown.await;
        info!("termination signal received, draining sessions");

        let coordinator = ShutdownCoordinator::new(
            self.state.registry.clone(),
            Duration::from_secs(self.state.config.shutdown_grace_secs),
        );
        let report = coordinator.shutdown().await;

        if let Some(reaper) = reaper {
            reaper.abort();
        }
        let _ = stop_tx.send(());
        server
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?
            .map_err(GatewayError::Io)?;

        Ok(report)
    }

    /// Get the bind address.
    fn bind_address(&self) -> SocketAddr {
        let ip = match self.state.config.bind {
            BindMode::Loopback => [127, 0, 0, 1],
            BindMode::Lan => [0, 0, 0, 0],
        };
        SocketAddr::from((ip, self.state.config.port))
    }

    /// Spawn the idle-stream reaper, if enabled.
    fn spawn_idle_reaper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let idle_secs = self.state.config.idle_timeout_secs;
        if idle_secs == 0 {
            return None;
        }

        let idle = Duration::from_secs(idle_secs);
        let scan = idle.min(Duration::from_secs(30)).max(Duration::from_secs(1));
        let registry = self.state.registry.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scan);
            loop {
                ticker.tick().await;
                for transport in registry.transports().await {
                    if transport.idle_for() >= idle {
                        info!(session_id = %transport.session_id(), "closing idle stream");
                        transport.close();
                    }
                }
            }
        }))
    }
}

/// Build a strict CORS layer for browser clients on localhost.
fn cors_layer() -> CorsLayer {
    let origins: Vec<_> = ALLOWED_ORIGINS
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Render a gateway error as an HTTP JSON body.
fn error_response(status: StatusCode, err: &GatewayError) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": err.kind(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

/// Closes the transport when the client's SSE connection goes away.
struct StreamGuard {
    transport: Arc<StreamTransport>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// `GET /stream` — open a stream and return its outbound sequence as SSE.
///
/// On any construction or attachment failure the transport is closed and
/// deregistered; no partial registration survives.
async fn open_stream(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    if let Err(e) = state.authenticate(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, &e);
    }

    let registry = state.registry.clone();
    let (transport, outbound) = StreamTransport::open(move |session_id| {
        // Deregistration runs off the close path so close stays callable
        // from sync contexts (the SSE drop guard).
        tokio::spawn(async move {
            registry.remove(&session_id).await;
        });
    });

    // The registry enforces the session limit and the draining flag under
    // its write lock; both reject with 503.
    let session_id = match state.registry.register(transport.clone()).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "stream registration rejected");
            transport.close();
            return error_response(StatusCode::SERVICE_UNAVAILABLE, &e);
        }
    };

    transport.bind_engine(state.engine.clone());
    if let Err(e) = state.engine.attach(transport.clone()).await {
        error!(session_id = %session_id, error = %e, "engine attach failed");
        transport.close();
        let err = GatewayError::RegistrationFailed(e.to_string());
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, &err);
    }

    info!(session_id = %session_id, "stream opened");

    let guard = StreamGuard { transport };
    let stream = UnboundedReceiverStream::new(outbound).map(move |frame| {
        let _hold = &guard;
        Ok::<Event, Infallible>(Event::default().event(frame.event()).data(frame.data()))
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECS)))
        .into_response()
}

/// `POST /message/{session_id}` — submit one inbound message.
///
/// Concurrent submissions for distinct sessions never serialize against
/// each other; within one session the transport preserves submission order.
async fn submit_message(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    if let Err(e) = state.authenticate(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, &e);
    }

    let Some(transport) = state.registry.lookup(&session_id).await else {
        return error_response(
            StatusCode::NOT_FOUND,
            &GatewayError::SessionNotFound(session_id),
        );
    };

    debug!(session_id = %session_id, tool = %request.method, "message submitted");

    match transport.accept(request).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "ok": true, "session_id": session_id })),
        )
            .into_response(),
        Err(e @ GatewayError::TransportClosed) => error_response(StatusCode::GONE, &e),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "message hand-off failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

/// `DELETE /stream/{session_id}` — client-initiated close.
async fn close_stream(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = state.authenticate(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, &e);
    }

    let Some(transport) = state.registry.lookup(&session_id).await else {
        return error_response(
            StatusCode::NOT_FOUND,
            &GatewayError::SessionNotFound(session_id),
        );
    };

    transport.close();
    info!(session_id = %session_id, "stream closed by client");
    StatusCode::NO_CONTENT.into_response()
}

/// Health check handler.
async fn health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let sessions = state.registry.count().await;
    Json(serde_json::json!({
        "status": "ok",
        "sessions": sessions,
    }))
}
