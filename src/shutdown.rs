//! Process-wide cancellation (§5 "Cancellation").
//!
//! A single broadcast-backed token every long-running loop observes at the
//! top of its iteration. Closing over `Ctrl+C` (or any other terminal
//! interrupt) flips it exactly once; every clone sees the flip.

use tokio::sync::watch;

/// A cheaply cloneable handle to the process shutdown signal.
#[derive(Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// A per-task view of the shutdown signal.
#[derive(Clone)]
pub struct ShutdownWatch {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownWatch) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, ShutdownWatch { rx })
    }

    /// Signal every watcher that the process is shutting down.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn watch(&self) -> ShutdownWatch {
        ShutdownWatch {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownWatch {
    /// True if a shutdown has been signaled.
    pub fn is_shutting_down(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a shutdown is signaled. Cancel-safe: usable directly in
    /// a `tokio::select!` arm alongside socket reads or tick timers.
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Wait for a terminal interrupt (SIGINT/Ctrl+C) and trigger `shutdown`.
pub async fn listen_for_interrupt(shutdown: Shutdown) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install Ctrl+C handler; shutdown signal unavailable");
        return;
    }
    tracing::info!("shutdown signal received");
    shutdown.trigger();
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_wakes_every_watcher() {
        let (shutdown, mut a) = Shutdown::new();
        let mut b = shutdown.watch();
        assert!(!a.is_shutting_down());
        assert!(!b.is_shutting_down());

        shutdown.trigger();
        a.wait().await;
        b.wait().await;
        assert!(a.is_shutting_down());
        assert!(b.is_shutting_down());
    }
}
