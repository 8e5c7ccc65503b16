//! Per-run pause/stop context
//!
//! One `RunControl` per agent run, cloned into every component that needs
//! to observe it. Operators flip the flags from outside; the scheduler checks
//! them at its loop head and every long wait goes through [`RunControl::sleep`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct RunFlags {
    paused: AtomicBool,
    stopped: AtomicBool,
    wake: Notify,
}

/// Shared pause/stop flags of one build run
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    flags: Arc<RunFlags>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        log::info!("[RunControl] Pause requested");
        self.flags.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        log::info!("[RunControl] Resume requested");
        self.flags.paused.store(false, Ordering::SeqCst);
        self.flags.wake.notify_waiters();
    }

    pub fn stop(&self) {
        log::info!("[RunControl] Stop requested");
        self.flags.stopped.store(true, Ordering::SeqCst);
        self.flags.wake.notify_waiters();
    }

    /// Re-arm a stopped control for a new run
    pub fn clear_stop(&self) {
        self.flags.stopped.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stopped.load(Ordering::SeqCst)
    }

    /// Sleep that ends early on stop or resume
    ///
    /// Returns `false` when the run has been stopped.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.flags.wake.notified();
        if self.is_stopped() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = notified => {}
        }
        !self.is_stopped()
    }
}
