//! Single-flight guard for message sends

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// One gate per manager, shared by every conversation: while it is held no
/// other send may start, whatever conversation it targets.
#[derive(Debug, Default)]
pub struct MessageGate {
    held: AtomicBool,
    idle_notify: Notify,
}

impl MessageGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate. Returns `false` without side effects if already held.
    pub fn try_acquire(&self) -> bool {
        let acquired = self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if acquired {
            tracing::debug!("message gate acquired");
        }
        acquired
    }

    /// Free the gate. Safe to call when already free.
    pub fn release(&self) {
        if self.held.swap(false, Ordering::AcqRel) {
            tracing::debug!("message gate released");
            self.idle_notify.notify_waiters();
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Wait until the gate is free.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_held() {
            return;
        }
        notified.await;
    }
}
