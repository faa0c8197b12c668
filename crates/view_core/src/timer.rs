use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

pub trait Timer: Send + Sync {
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
    /// Cancelling a timer that already fired is a no-op.
    fn cancel(&self, handle: TimerHandle);
}

/// Timer backed by `tokio::time::sleep`. Needs a running tokio runtime.
#[derive(Default)]
pub struct TokioTimer {
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, AbortHandle>>>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Timer for TokioTimer {
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);

        // the map stays locked until the abort handle is stored, so a zero
        // delay cannot fire and remove itself before it was registered
        let mut guard = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let still_pending = pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id)
                .is_some();
            if still_pending {
                callback();
            }
        });
        guard.insert(id, task.abort_handle());

        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let removed = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);
        if let Some(task) = removed {
            task.abort();
        }
    }
}
