//! Process-wide shutdown signal and step cancellation.

use fleet_core::effects::CancellationToken;
use fleet_core::{BootstrapError, BootstrapStep};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Shutdown request shared between the signal handler and the bootstrap pass.
///
/// Cloning yields another handle to the same signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub fn cancellation_token(&self) -> Arc<dyn CancellationToken> {
        Arc::new(ShutdownToken {
            shutdown_rx: self.shutdown_tx.subscribe(),
        })
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct ShutdownToken {
    shutdown_rx: watch::Receiver<bool>,
}

#[async_trait::async_trait]
impl CancellationToken for ShutdownToken {
    async fn cancelled(&self) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            if *shutdown_rx.borrow_and_update() {
                return;
            }
            if shutdown_rx.changed().await.is_err() {
                // Every signal handle is gone, so shutdown can no longer be requested.
                std::future::pending::<()>().await;
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown_rx.borrow()
    }
}

/// Run one blocking bootstrap step, abandoning it if cancellation is requested
/// first or while it is outstanding.
pub(crate) async fn cancellable<T, F>(
    token: &dyn CancellationToken,
    step: BootstrapStep,
    fut: F,
) -> Result<T, BootstrapError>
where
    F: Future<Output = Result<T, BootstrapError>>,
{
    if token.is_cancelled() {
        return Err(BootstrapError::cancelled(step));
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::warn!(%step, "bootstrap step cancelled");
            Err(BootstrapError::cancelled(step))
        }
        result = fut => result,
    }
}
