//! Graceful shutdown coordination via `CancellationToken`.
//!
//! The token is shared with the HTTP server (stops accepting) and with every
//! WebSocket session (sends a Close frame and exits).

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long `graceful_shutdown` waits when the caller gives no timeout.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the token shared by the HTTP server and every WebSocket session.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// A coordinator whose token is still live.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A handle to the shared token. Cancelling any handle stops everything.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the token. Repeated calls do nothing.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for Ctrl-C (or a shutdown triggered elsewhere), then cancel the
    /// token.
    pub async fn wait_for_signal(&self) {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for ctrl-c");
                }
                info!("shutdown signal received");
            }
            () = self.token.cancelled() => {}
        }
        self.shutdown();
    }

    /// Cancel the token, then give `handles` up to `timeout` (10 s by
    /// default) to finish. Tasks still running afterwards are left alone.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.shutdown();
        info!(tasks = handles.len(), ?timeout, "draining tasks");

        let pending = futures::future::join_all(handles);
        if tokio::time::timeout(timeout, pending).await.is_err() {
            warn!(?timeout, "tasks still running after shutdown timeout");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
