//! Shutdown signal handling for the record and serve commands

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Resolves once Ctrl-C (or SIGTERM on unix) arrives.
///
/// Cloneable; every clone observes the same shutdown.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Request shutdown without an OS signal
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Install the OS signal handlers. Must run inside the tokio runtime.
    pub async fn setup(&self) -> Result<(), std::io::Error> {
        let on_interrupt = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("received interrupt");
                on_interrupt.trigger();
            }
        });

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            let on_terminate = self.clone();
            tokio::spawn(async move {
                sigterm.recv().await;
                debug!("received SIGTERM");
                on_terminate.trigger();
            });
        }

        Ok(())
    }

    /// Wait until shutdown is requested
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|requested| *requested).await;
    }

    /// Owned future for APIs that need `'static`, such as graceful shutdown
    pub fn into_future(self) -> impl Future<Output = ()> + Send + 'static {
        async move { self.wait().await }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn shutdown_signal_default_is_false() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn trigger_is_seen_by_clones() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        clone.trigger();
        assert!(signal.is_shutdown());
    }

    #[tokio::test]
    async fn wait_resolves_after_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = tokio::spawn(signal.clone().into_future());
        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn wait_after_trigger_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .unwrap();
    }
}
