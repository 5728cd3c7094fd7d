//! Graceful shutdown controller for the tally node.
//!
//! Listens for SIGINT/SIGTERM and cancels a root [`CancellationToken`].
//! Subsystems hold child tokens, so cancelling the root reaches every one of
//! them while a subsystem can still be stopped on its own.

use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Coordinates graceful shutdown across all node subsystems.
///
/// Subsystems call [`subscribe`](Self::subscribe) to get a token, then
/// `select!` on `token.cancelled()` alongside their main loop.
pub struct ShutdownController {
    root: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
        }
    }

    /// A token cancelled when shutdown is triggered.
    pub fn subscribe(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Wait for SIGTERM or SIGINT (or a programmatic shutdown), then
    /// trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
            _ = self.root.cancelled() => {}
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn programmatic_shutdown_cancels_subscribers() {
        let controller = ShutdownController::new();
        let token = controller.subscribe();
        controller.shutdown();
        token.cancelled().await;
        assert!(controller.is_shutdown());
    }

    #[tokio::test]
    async fn subscriber_can_stop_alone() {
        let controller = ShutdownController::new();
        let a = controller.subscribe();
        let b = controller.subscribe();
        a.cancel();
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!controller.is_shutdown());
    }

    #[tokio::test]
    async fn wait_for_signal_returns_after_programmatic_shutdown() {
        let controller = std::sync::Arc::new(ShutdownController::new());
        let waiter = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.wait_for_signal().await })
        };
        controller.shutdown();
        waiter.await.unwrap();
    }
}
