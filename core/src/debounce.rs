//! Single-slot cancellable delayed task.
//!
//! At most one task is pending per `Debouncer`. The very first task runs on
//! the next tick. Every later one waits the full debounce duration, and
//! scheduling while a task is still waiting cancels it. Once a task's delay
//! has elapsed it is detached from the slot and can no longer be cancelled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    /// Set once any task has been scheduled.
    armed: bool,
    pending: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
pub struct Debouncer {
    slot: Mutex<Slot>,
}

impl Debouncer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Schedule `task`, cancelling whatever was pending. Returns the delay
    /// applied to `task`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(self: &Arc<Self>, duration: Duration, task: F) -> Duration
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }
        let delay = if slot.armed { duration } else { Duration::ZERO };
        slot.armed = true;
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        let this = Arc::clone(self);
        slot.pending = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if this.fire(generation) {
                task.await;
            }
        }));
        delay
    }

    /// Detach the task of `generation` from the slot. False when a later
    /// schedule replaced it in the meantime.
    fn fire(&self, generation: u64) -> bool {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return false;
        }
        slot.pending = None;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

}
