//! Process-wide user interrupt (Ctrl-C).
//!
//! One signal listener counts presses into a watch channel for the lifetime
//! of the process. Every pipeline stage shares the same [`Interrupt`]: a
//! stage either checks whether any press happened or waits for a press newer
//! than the count it started with, so a press made between two stages is
//! never lost.

use tokio::sync::watch;
use tracing::{debug, warn};

/// Receiving side of the interrupt counter. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Interrupt {
    presses: watch::Receiver<usize>,
}

/// Triggers an [`Interrupt`] programmatically.
#[derive(Debug)]
pub struct InterruptHandle {
    presses: watch::Sender<usize>,
}

impl InterruptHandle {
    /// Records one press.
    pub fn trigger(&self) {
        self.presses.send_modify(|n| *n += 1);
    }
}

impl Interrupt {
    /// Listens for Ctrl-C for the rest of the process.
    ///
    /// Must be called from within a tokio runtime. If the signal handler
    /// cannot be installed the interrupt never fires.
    pub fn ctrl_c() -> Self {
        let (handle, interrupt) = Self::manual();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    debug!("Ctrl-C handler unavailable: {}", e);
                    return;
                }
                warn!("Keyboard interruption detected, stopping...");
                handle.trigger();
            }
        });
        interrupt
    }

    /// An interrupt fired only through the returned handle.
    pub fn manual() -> (InterruptHandle, Self) {
        let (tx, rx) = watch::channel(0);
        (InterruptHandle { presses: tx }, Self { presses: rx })
    }

    /// An interrupt that never fires.
    pub fn never() -> Self {
        Self::manual().1
    }

    /// Number of presses so far.
    pub fn presses(&self) -> usize {
        *self.presses.borrow()
    }

    /// Whether the user has interrupted at least once.
    pub fn is_triggered(&self) -> bool {
        self.presses() > 0
    }

    /// Completes once any press has happened, including earlier ones.
    pub async fn triggered(&self) {
        self.pressed_after(0).await
    }

    /// Completes once the press count exceeds `seen`.
    ///
    /// Never completes once the sending side is gone.
    pub async fn pressed_after(&self, seen: usize) {
        let mut presses = self.presses.clone();
        loop {
            let current = *presses.borrow_and_update();
            if current > seen {
                return;
            }
            if presses.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
