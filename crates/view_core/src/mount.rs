//! Liveness scope for a mounted component.
//!
//! Every async task, timer callback and observer a component starts holds a
//! clone of its [`MountGuard`]. State writes go through
//! [`MountGuard::run_if_alive`], which holds the liveness lock for the
//! duration of the write, so once [`MountGuard::teardown`] has returned no
//! write can land.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use tokio::task::{AbortHandle, JoinHandle};

type TeardownHook = Box<dyn FnOnce() + Send>;

struct MountInner {
    alive: AtomicBool,
    update_lock: Mutex<()>,
    tasks: Mutex<Vec<AbortHandle>>,
    hooks: Mutex<Vec<TeardownHook>>,
}

#[derive(Clone)]
pub struct MountGuard {
    inner: Arc<MountInner>,
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl MountGuard {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MountInner {
                alive: AtomicBool::new(true),
                update_lock: Mutex::new(()),
                tasks: Mutex::new(Vec::new()),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    /// Runs `f` while the mount is alive; returns `None` once it is torn down.
    ///
    /// `f` must not call [`MountGuard::teardown`] on the same guard.
    pub fn run_if_alive<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let _lock = self
            .inner
            .update_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.is_alive() {
            return None;
        }
        Some(f())
    }

    /// Spawns `future` on the current tokio runtime, aborted on teardown.
    /// Nothing is spawned once the mount is dead.
    pub fn spawn<F>(&self, future: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if !self.is_alive() {
            return None;
        }

        let task = tokio::spawn(future);
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task.abort_handle());

        // teardown may have drained the task list between the check and the push
        if !self.is_alive() {
            task.abort();
        }
        Some(task)
    }

    /// Registers `hook` to run once on teardown. Runs it right away when the
    /// mount is already dead.
    pub fn on_teardown(&self, hook: impl FnOnce() + Send + 'static) {
        if self.is_alive() {
            let mut hooks = self
                .inner
                .hooks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.is_alive() {
                hooks.push(Box::new(hook));
                return;
            }
        }
        hook();
    }

    /// Marks the mount dead, aborts its tasks and runs teardown hooks.
    /// Idempotent.
    pub fn teardown(&self) {
        {
            let _lock = self
                .inner
                .update_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.inner.alive.swap(false, Ordering::SeqCst) {
                return;
            }
        }

        let tasks = std::mem::take(
            &mut *self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for task in tasks {
            task.abort();
        }

        let hooks = std::mem::take(
            &mut *self
                .inner
                .hooks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for hook in hooks {
            hook();
        }
    }
}

#[cfg(test)]
#[path = "tests/mount_tests.rs"]
mod tests;
