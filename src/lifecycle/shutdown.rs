//! Set-once shutdown signal.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Shutdown flag that flips exactly once and wakes every subscriber.
///
/// The atomic elects a single caller to perform shutdown side effects; the
/// watch channel lets long-running tasks await the transition.
#[derive(Debug)]
pub struct Shutdown {
    triggered: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new, untriggered shutdown signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            triggered: AtomicBool::new(false),
            tx,
        }
    }

    /// Trigger the shutdown signal.
    ///
    /// Returns `true` only for the caller that actually flipped it.
    pub fn trigger(&self) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.tx.send_replace(true);
        true
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of a [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered.
    ///
    /// Also resolves if the owning `Shutdown` is dropped.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}
