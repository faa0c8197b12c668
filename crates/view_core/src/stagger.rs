//! Per-item stagger delays and timer-driven staggered reveals.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::sync::watch;

use crate::{
    mount::MountGuard,
    timer::{Timer, TimerHandle},
};

/// `index * base_interval`, saturating for absurd indices.
pub fn stagger_delay(index: usize, base_interval: Duration) -> Duration {
    let factor = u32::try_from(index).unwrap_or(u32::MAX);
    base_interval.saturating_mul(factor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StaggerEntry {
    pub index: usize,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaggerSchedule {
    base_interval: Duration,
    entries: Vec<StaggerEntry>,
}

impl StaggerSchedule {
    pub fn new(count: usize, base_interval: Duration) -> Self {
        let entries = (0..count)
            .map(|index| StaggerEntry {
                index,
                delay: stagger_delay(index, base_interval),
            })
            .collect();
        Self {
            base_interval,
            entries,
        }
    }

    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn delay(&self, index: usize) -> Option<Duration> {
        self.entries.get(index).map(|entry| entry.delay)
    }

    pub fn entries(&self) -> &[StaggerEntry] {
        &self.entries
    }
}

/// Reveals the items of a schedule one by one, each after its own delay.
pub struct StaggeredReveal {
    guard: MountGuard,
    revealed: watch::Receiver<Vec<bool>>,
}

impl StaggeredReveal {
    pub fn start(schedule: &StaggerSchedule, timer: Arc<dyn Timer>) -> Self {
        let guard = MountGuard::new();
        let (tx, revealed) = watch::channel(vec![false; schedule.len()]);
        let tx = Arc::new(tx);
        let handles: Arc<Mutex<Vec<TimerHandle>>> = Arc::new(Mutex::new(Vec::new()));

        for entry in schedule.entries() {
            let index = entry.index;
            let tx = Arc::clone(&tx);
            let callback_guard = guard.clone();
            let handle = timer.after(
                entry.delay,
                Box::new(move || {
                    callback_guard.run_if_alive(|| {
                        tx.send_modify(|flags| {
                            if let Some(flag) = flags.get_mut(index) {
                                *flag = true;
                            }
                        })
                    });
                }),
            );
            handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle);
        }

        guard.on_teardown(move || {
            let pending =
                std::mem::take(&mut *handles.lock().unwrap_or_else(PoisonError::into_inner));
            for handle in pending {
                timer.cancel(handle);
            }
        });

        Self { guard, revealed }
    }

    pub fn is_revealed(&self, index: usize) -> bool {
        self.revealed.borrow().get(index).copied().unwrap_or(false)
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.borrow().iter().filter(|flag| **flag).count()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<bool>> {
        self.revealed.clone()
    }

    pub fn teardown(&self) {
        self.guard.teardown();
    }
}

impl Drop for StaggeredReveal {
    fn drop(&mut self) {
        self.guard.teardown();
    }
}

#[cfg(test)]
#[path = "tests/stagger_tests.rs"]
mod tests;
