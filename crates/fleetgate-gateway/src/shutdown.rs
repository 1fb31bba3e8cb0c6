//! Shutdown coordinator: drains the registry and closes every transport.

use crate::registry::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of a shutdown sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownReport {
    /// Transports that closed within the teardown budget.
    pub closed: usize,

    /// Transports that missed the budget. A warning, not a fatal condition.
    pub failed: usize,
}

impl ShutdownReport {
    /// Whether every transport closed within its budget.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Drains the session registry on process termination.
pub struct ShutdownCoordinator {
    registry: Arc<SessionRegistry>,
    grace: Duration,
}

impl ShutdownCoordinator {
    /// Create a coordinator with a per-transport teardown budget.
    pub fn new(registry: Arc<SessionRegistry>, grace: Duration) -> Self {
        Self { registry, grace }
    }

    /// Close every live transport.
    ///
    /// The drain makes the registry reject new registrations, so no stream
    /// can open behind the sweep's back. Closes run in parallel; each
    /// failure is logged and the sweep continues (best-effort, not
    /// all-or-nothing).
    pub async fn shutdown(&self) -> ShutdownReport {
        let transports = self.registry.drain().await;
        if transports.is_empty() {
            info!("shutdown: no live sessions");
            return ShutdownReport::default();
        }

        info!(sessions = transports.len(), "shutdown: closing live sessions");

        let grace = self.grace;
        let sweeps = transports.into_iter().map(|transport| async move {
            transport.close();
            // The close cancels any in-flight hand-off; wait for it to unwind.
            match tokio::time::timeout(grace, transport.settled()).await {
                Ok(()) => true,
                Err(_) => {
                    warn!(
                        session_id = %transport.session_id(),
                        "transport did not settle within teardown budget"
                    );
                    false
                }
            }
        });

        let results = futures::future::join_all(sweeps).await;
        let closed = results.iter().filter(|ok| **ok).count();
        let failed = results.len() - closed;

        if failed > 0 {
            warn!(closed, failed, "shutdown sweep finished with failures");
        } else {
            info!(closed, "shutdown sweep finished");
        }

        ShutdownReport { closed, failed }
    }
}
