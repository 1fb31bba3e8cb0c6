//! Stream transport: one session's outbound frame sequence plus its
//! serialized inbound hand-off.
//!
//! A transport is deliberately wire-agnostic. The binder turns the outbound
//! receiver into an SSE body; nothing in this module knows about HTTP.

use crate::engine::ProtocolEngine;
use crate::error::GatewayError;
use crate::rpc::JsonRpcRequest;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One discrete unit of data written to a client's outbound sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// First frame on every stream; carries the session identity out-of-band.
    Endpoint { session_id: String },

    /// A JSON-RPC response or notification payload.
    Message { payload: String },
}

impl Frame {
    /// Build the endpoint frame for a session.
    pub fn endpoint(session_id: impl Into<String>) -> Self {
        Self::Endpoint {
            session_id: session_id.into(),
        }
    }

    /// Build a message frame from a JSON payload.
    pub fn message(payload: &serde_json::Value) -> Self {
        Self::Message {
            payload: payload.to_string(),
        }
    }

    /// SSE event name for this frame.
    pub fn event(&self) -> &'static str {
        match self {
            Self::Endpoint { .. } => "endpoint",
            Self::Message { .. } => "message",
        }
    }

    /// SSE data payload for this frame.
    pub fn data(&self) -> String {
        match self {
            Self::Endpoint { session_id } => {
                serde_json::json!({ "session_id": session_id }).to_string()
            }
            Self::Message { payload } => payload.clone(),
        }
    }
}

/// Transport lifecycle state.
///
/// `Open` is entered directly at construction; there is no negotiation
/// phase. `Closing` coalesces concurrent close requests: only the first
/// caller performs teardown. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Open,
    Closing,
    Closed,
}

/// Callback invoked exactly once when the transport closes.
pub type CloseCallback = Box<dyn FnOnce(String) + Send>;

/// A single client's long-lived receive channel.
///
/// Owns the outbound frame sequence for exactly one client connection and
/// accepts inbound messages one at a time. The inbound side is serialized
/// through a FIFO mutex, so messages for one session are processed in
/// submission order; distinct transports process concurrently.
pub struct StreamTransport {
    session_id: String,
    created_at: chrono::DateTime<chrono::Utc>,
    state: Mutex<TransportState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    on_close: Mutex<Option<CloseCallback>>,
    engine: Mutex<Option<Arc<dyn ProtocolEngine>>>,
    inbound: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
    last_activity: Mutex<Instant>,
}

impl StreamTransport {
    /// Open a new transport: allocates the session identity and begins the
    /// outbound sequence. Returns the transport and the receiving half of
    /// its outbound channel; the sequence ends when the transport closes.
    pub fn open(
        on_close: impl FnOnce(String) + Send + 'static,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            session_id: fleetgate_core::id::session_id(),
            created_at: chrono::Utc::now(),
            state: Mutex::new(TransportState::Open),
            outbound: Mutex::new(Some(tx)),
            on_close: Mutex::new(Some(Box::new(on_close))),
            engine: Mutex::new(None),
            inbound: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
            last_activity: Mutex::new(Instant::now()),
        });
        debug!(session_id = %transport.session_id, "transport opened");
        (transport, rx)
    }

    /// The session identity allocated at open time. Never reused.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransportState {
        *self.state.lock()
    }

    /// Whether the transport still accepts traffic.
    pub fn is_open(&self) -> bool {
        self.state() == TransportState::Open
    }

    /// Time since the last inbound or outbound activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Wire the protocol engine that will consume inbound messages.
    /// Called by the binder before `ProtocolEngine::attach`.
    pub fn bind_engine(&self, engine: Arc<dyn ProtocolEngine>) {
        *self.engine.lock() = Some(engine);
    }

    /// Append a frame to the outbound sequence.
    ///
    /// Buffers without suspending the caller. Fails with `TransportClosed`
    /// after teardown or once the client side of the channel is gone; it
    /// never panics on a dropped connection.
    pub fn send(&self, frame: Frame) -> Result<()> {
        {
            let outbound = self.outbound.lock();
            let tx = outbound.as_ref().ok_or(GatewayError::TransportClosed)?;
            tx.send(frame).map_err(|_| GatewayError::TransportClosed)?;
        }
        self.touch();
        Ok(())
    }

    /// Hand one inbound message to the protocol engine.
    ///
    /// Hand-offs are serialized per transport (FIFO), so a session's
    /// messages are processed in submission order. The call resolves with
    /// `TransportClosed` instead of hanging if the transport closes while
    /// the message is queued or mid-flight.
    pub async fn accept(&self, request: JsonRpcRequest) -> Result<()> {
        let _guard = tokio::select! {
            guard = self.inbound.lock() => guard,
            _ = self.cancel.cancelled() => return Err(GatewayError::TransportClosed),
        };

        if !self.is_open() {
            return Err(GatewayError::TransportClosed);
        }

        let engine = self
            .engine
            .lock()
            .clone()
            .ok_or_else(|| GatewayError::Internal("no protocol engine attached".to_string()))?;

        self.touch();
        tokio::select! {
            result = engine.handle(self, request) => result,
            _ = self.cancel.cancelled() => Err(GatewayError::TransportClosed),
        }
    }

    /// Close the transport. Idempotent; concurrent calls are coalesced.
    ///
    /// Stops the outbound sequence, cancels any in-flight `accept`, and
    /// fires the close callback exactly once. Safe to call from the client
    /// disconnect path, an internal error path, and process shutdown.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state != TransportState::Open {
                return;
            }
            *state = TransportState::Closing;
        }

        self.cancel.cancel();
        self.outbound.lock().take();
        let callback = self.on_close.lock().take();
        *self.state.lock() = TransportState::Closed;
        debug!(session_id = %self.session_id, "transport closed");

        if let Some(callback) = callback {
            callback(self.session_id.clone());
        }
    }

    /// Wait until any in-flight inbound hand-off has unwound.
    ///
    /// Used by the shutdown coordinator to bound teardown: after `close`,
    /// the pending `accept` (if any) observes cancellation and releases the
    /// inbound lock.
    pub async fn settled(&self) {
        let _guard = self.inbound.lock().await;
    }
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish()
    }
}
