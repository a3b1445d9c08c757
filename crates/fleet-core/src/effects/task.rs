//! Cooperative cancellation.

use async_trait::async_trait;

/// Cooperative cancellation token.
#[async_trait]
pub trait CancellationToken: Send + Sync {
    /// Resolves when cancellation is requested.
    async fn cancelled(&self);

    /// Non-blocking cancellation check.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Cancellation token that never triggers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

#[async_trait]
impl CancellationToken for NeverCancel {
    async fn cancelled(&self) {
        futures::future::pending::<()>().await;
    }
}
