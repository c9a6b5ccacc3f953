//! Shutdown coordination for the gateway.

use tokio::sync::watch;

/// Latched shutdown flag shared by the server and background tasks.
///
/// Once triggered it stays triggered, so a receiver created after the
/// signal still observes it.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Trigger shutdown. Later calls are no-ops.
    pub fn trigger(&self) {
        self.tx.send_if_modified(|stopping| !std::mem::replace(stopping, true));
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `rx` has seen the shutdown flag, or its sender is gone.
pub async fn triggered(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopping| *stopping).await;
}
