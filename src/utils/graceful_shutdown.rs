use eyre::{Result, WrapErr};
use tokio::{signal, sync::watch};

/// Why the server is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM, SIGINT or a manual trigger
    Graceful,
    /// The shutdown channel went away without a signal
    Force,
}

/// Fans a single shutdown event out to every waiter.
///
/// The state lives in a `watch` channel so that waiters subscribing after the
/// trigger still observe it.
pub struct GracefulShutdown {
    state: watch::Sender<Option<ShutdownReason>>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self { state }
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Start shutdown. Only the first call has an effect.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        let changed = self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(reason);
            true
        });

        if changed {
            tracing::info!("Shutdown triggered: {:?}", reason);
        } else {
            tracing::debug!("Shutdown already initiated, ignoring {:?}", reason);
        }
    }

    /// Wait for SIGINT or SIGTERM and trigger a graceful shutdown.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::info!("Signal handler started. Listening for SIGTERM and SIGINT");

        #[cfg(unix)]
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to register SIGTERM handler")?;

        #[cfg(unix)]
        let terminate = sigterm.recv();
        #[cfg(not(unix))]
        let terminate = std::future::pending::<Option<()>>();

        tokio::select! {
            result = signal::ctrl_c() => {
                result.wrap_err("Failed to listen for SIGINT")?;
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        self.trigger_shutdown(ShutdownReason::Graceful);
        Ok(())
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(Option::is_some).await {
            Ok(state) => (*state).unwrap_or(ShutdownReason::Force),
            Err(_) => {
                tracing::warn!("Shutdown channel closed unexpectedly");
                ShutdownReason::Force
            }
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[tokio::test]
    async fn test_graceful_shutdown_creation() {
        let shutdown = GracefulShutdown::new();
        assert!(!shutdown.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_trigger_wakes_waiters() {
        let shutdown = Arc::new(GracefulShutdown::new());

        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait_for_shutdown_signal().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.trigger_shutdown(ShutdownReason::Graceful);

        let reason = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reason, ShutdownReason::Graceful);
    }

    #[tokio::test]
    async fn test_late_waiter_sees_shutdown() {
        let shutdown = GracefulShutdown::new();
        shutdown.trigger_shutdown(ShutdownReason::Graceful);
        assert!(shutdown.is_shutdown_initiated());

        assert_eq!(
            shutdown.wait_for_shutdown_signal().await,
            ShutdownReason::Graceful
        );
    }

    #[tokio::test]
    async fn test_first_reason_is_kept() {
        let shutdown = GracefulShutdown::new();
        shutdown.trigger_shutdown(ShutdownReason::Force);
        shutdown.trigger_shutdown(ShutdownReason::Graceful);

        assert_eq!(
            shutdown.wait_for_shutdown_signal().await,
            ShutdownReason::Force
        );
    }
}
