//! Session registry: the single shared-mutable-state boundary in the core.

use crate::error::GatewayError;
use crate::transport::StreamTransport;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

struct RegistryInner {
    entries: HashMap<String, Arc<StreamTransport>>,
    draining: bool,
}

/// Maps session identity to its active transport.
///
/// All mutations (`register`, `remove`, `drain`) are mutually exclusive;
/// lookups run concurrently with each other. One coarse lock is enough:
/// message volume never justifies sharding here.
pub struct SessionRegistry {
    inner: RwLock<RegistryInner>,
    limit: Option<usize>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create an unbounded session registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                entries: HashMap::new(),
                draining: false,
            }),
            limit: None,
        }
    }

    /// Create a registry that holds at most `limit` live sessions.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Store a transport under its session identity and return the identity.
    ///
    /// Fails with `ShuttingDown` once the registry has been drained, so a
    /// stream-open racing a shutdown cannot slip in, and with
    /// `RegistrationFailed` when the session limit is reached. Both checks
    /// run under the write lock, so concurrent stream-opening flows cannot
    /// overshoot the limit between a check and an insert.
    pub async fn register(&self, transport: Arc<StreamTransport>) -> Result<String> {
        let mut inner = self.inner.write().await;
        if inner.draining {
            return Err(GatewayError::ShuttingDown);
        }

        if let Some(limit) = self.limit {
            if inner.entries.len() >= limit {
                return Err(GatewayError::RegistrationFailed(format!(
                    "session limit reached ({limit})"
                )));
            }
        }

        let session_id = transport.session_id().to_string();
        if inner.entries.contains_key(&session_id) {
            // Unreachable with 128-bit random identities; guard the invariant anyway.
            return Err(GatewayError::RegistrationFailed(format!(
                "duplicate session id {session_id}"
            )));
        }

        inner.entries.insert(session_id.clone(), transport);
        debug!(session_id = %session_id, sessions = inner.entries.len(), "session registered");
        Ok(session_id)
    }

    /// Look up the transport for a session.
    pub async fn lookup(&self, session_id: &str) -> Option<Arc<StreamTransport>> {
        let inner = self.inner.read().await;
        inner.entries.get(session_id).cloned()
    }

    /// Remove a session. Idempotent: removing an absent identity is not an error.
    pub async fn remove(&self, session_id: &str) {
        let mut inner = self.inner.write().await;
        if inner.entries.remove(session_id).is_some() {
            debug!(session_id = %session_id, sessions = inner.entries.len(), "session removed");
        }
    }

    /// Atomically empty the registry and return everything that was present.
    ///
    /// Used only during shutdown. Afterwards the registry is dead: every
    /// subsequent `register` fails fast with `ShuttingDown`.
    pub async fn drain(&self) -> Vec<Arc<StreamTransport>> {
        let mut inner = self.inner.write().await;
        inner.draining = true;
        inner.entries.drain().map(|(_, transport)| transport).collect()
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.entries.len()
    }

    /// Snapshot of the live transports, used by the idle reaper.
    pub async fn transports(&self) -> Vec<Arc<StreamTransport>> {
        let inner = self.inner.read().await;
        inner.entries.values().cloned().collect()
    }
}
