//! Cooperative shutdown signalling for the crawl loops.
//!
//! A [`ShutdownTrigger`] flips a `watch` channel once; every cloned
//! [`Shutdown`] observes it. Loops race their sleeps against it and check it
//! between fan-out groups, so in-flight work finishes before they return.

use std::time::Duration;

use tokio::sync::watch;

/// Sending half, held by whoever decides the process should stop.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half, cloned into each loop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Creates a linked trigger/handle pair.
#[must_use]
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    /// A handle that never fires, for one-shot commands.
    #[must_use]
    pub fn never() -> Self {
        let (_, shutdown) = channel();
        shutdown
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered. Pends forever if the
    /// trigger was dropped without firing.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleeps for `duration` unless shutdown fires first.
    ///
    /// Returns `true` if the full duration elapsed and `false` if the sleep
    /// was cut short (or shutdown had already been triggered).
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = self.wait() => false,
        }
    }
}
