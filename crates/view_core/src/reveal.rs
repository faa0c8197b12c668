//! Visibility-gated reveal state.
//!
//! [`RevealMachine`] is the pure state machine; [`RevealController`] wires it
//! to a [`ViewportSignal`]; [`DelayedReveal`] is the time-based variant.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::{stream::BoxStream, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::{mount::MountGuard, timer::Timer};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub String);

impl RegionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealOptions {
    /// Fraction of the region that must be visible, in `0.0..=1.0`.
    pub threshold: f32,
    /// Latch on first reveal and stop observing.
    pub once: bool,
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            once: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RevealState {
    pub has_revealed: bool,
    pub triggered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealTransition {
    Unchanged,
    Revealed,
    Hidden,
    /// Revealed in one-shot mode; the caller should stop observing.
    Latched,
}

impl RevealTransition {
    pub fn changed(&self) -> bool {
        !matches!(self, RevealTransition::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct RevealMachine {
    once: bool,
    latched: bool,
    state: RevealState,
}

impl RevealMachine {
    pub fn new(once: bool) -> Self {
        Self {
            once,
            latched: false,
            state: RevealState::default(),
        }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn on_signal(&mut self, intersecting: bool, now: DateTime<Utc>) -> RevealTransition {
        if self.latched {
            return RevealTransition::Unchanged;
        }

        match (intersecting, self.state.has_revealed) {
            (true, false) => {
                self.state.has_revealed = true;
                self.state.triggered_at = Some(now);
                if self.once {
                    self.latched = true;
                    RevealTransition::Latched
                } else {
                    RevealTransition::Revealed
                }
            }
            (false, true) => {
                self.state.has_revealed = false;
                RevealTransition::Hidden
            }
            _ => RevealTransition::Unchanged,
        }
    }
}

/// Identifies one `observe` call on a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

pub struct Observation {
    pub id: ObserverId,
    pub signals: BoxStream<'static, bool>,
}

/// Viewport intersection source, e.g. a browser `IntersectionObserver`.
///
/// One region may be watched by several observers at once; `unobserve`
/// detaches only the observer it names.
pub trait ViewportSignal: Send + Sync {
    /// Starts watching `region`; yields `true` when it crosses into view at
    /// `threshold` and `false` when it leaves.
    fn observe(&self, region: &RegionId, threshold: f32) -> Observation;
    fn unobserve(&self, region: &RegionId, observer: ObserverId);
}

struct Detach {
    viewport: Arc<dyn ViewportSignal>,
    region: RegionId,
    observer: ObserverId,
    done: AtomicBool,
}

impl Detach {
    fn run(&self) {
        if !self.done.swap(true, Ordering::SeqCst) {
            self.viewport.unobserve(&self.region, self.observer);
            debug!(region = %self.region, "reveal observer detached");
        }
    }
}

pub struct RevealController {
    viewport: Arc<dyn ViewportSignal>,
}

impl RevealController {
    pub fn new(viewport: Arc<dyn ViewportSignal>) -> Self {
        Self { viewport }
    }

    /// Must be called from within a tokio runtime.
    pub fn observe(&self, region: RegionId, options: RevealOptions) -> RevealHandle {
        let guard = MountGuard::new();
        let (tx, state) = watch::channel(RevealState::default());
        let Observation {
            id: observer,
            signals: mut signals,
        } = self.viewport.observe(&region, options.threshold);

        let detach = Arc::new(Detach {
            viewport: Arc::clone(&self.viewport),
            region: region.clone(),
            observer,
            done: AtomicBool::new(false),
        });
        {
            let detach = Arc::clone(&detach);
            guard.on_teardown(move || detach.run());
        }

        let task_guard = guard.clone();
        let task_region = region.clone();
        guard.spawn(async move {
            let mut machine = RevealMachine::new(options.once);
            while let Some(intersecting) = signals.next().await {
                let transition = machine.on_signal(intersecting, Utc::now());
                if transition.changed() {
                    let next = machine.state();
                    if task_guard.run_if_alive(|| tx.send_replace(next)).is_none() {
                        break;
                    }
                    debug!(region = %task_region, ?transition, "reveal state changed");
                }
                if transition == RevealTransition::Latched {
                    detach.run();
                    break;
                }
            }
        });

        RevealHandle {
            region,
            guard,
            state,
        }
    }
}

pub struct RevealHandle {
    region: RegionId,
    guard: MountGuard,
    state: watch::Receiver<RevealState>,
}

impl RevealHandle {
    pub fn region(&self) -> &RegionId {
        &self.region
    }

    pub fn state(&self) -> RevealState {
        *self.state.borrow()
    }

    pub fn is_revealed(&self) -> bool {
        self.state.borrow().has_revealed
    }

    pub fn subscribe(&self) -> watch::Receiver<RevealState> {
        self.state.clone()
    }

    /// Waits until the region reports revealed. Returns `false` if the
    /// observer ended first.
    pub async fn revealed(&mut self) -> bool {
        self.state.wait_for(|state| state.has_revealed).await.is_ok()
    }

    pub fn teardown(&self) {
        self.guard.teardown();
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.guard.teardown();
    }
}

/// Flips false -> true once, `delay` after construction.
pub struct DelayedReveal {
    guard: MountGuard,
    fired: watch::Receiver<bool>,
}

impl DelayedReveal {
    pub fn after_delay(delay: Duration, timer: Arc<dyn Timer>) -> Self {
        let guard = MountGuard::new();
        let (tx, fired) = watch::channel(false);

        let callback_guard = guard.clone();
        let handle = timer.after(
            delay,
            Box::new(move || {
                callback_guard.run_if_alive(|| tx.send_replace(true));
            }),
        );
        guard.on_teardown(move || timer.cancel(handle));

        Self { guard, fired }
    }

    pub fn after_ms(ms: u64, timer: Arc<dyn Timer>) -> Self {
        Self::after_delay(Duration::from_millis(ms), timer)
    }

    pub fn is_revealed(&self) -> bool {
        *self.fired.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.fired.clone()
    }

    pub fn teardown(&self) {
        self.guard.teardown();
    }
}

impl Drop for DelayedReveal {
    fn drop(&mut self) {
        self.guard.teardown();
    }
}

#[derive(Default)]
struct ManualViewportState {
    next_observer: u64,
    senders: HashMap<RegionId, Vec<(ObserverId, mpsc::UnboundedSender<bool>)>>,
    initial: HashMap<RegionId, bool>,
    thresholds: HashMap<RegionId, f32>,
    unobserved: Vec<RegionId>,
}

/// Viewport whose intersection events are pushed by hand. Used by the CLI
/// harness and tests, and by hosts that compute visibility themselves.
#[derive(Default)]
pub struct ManualViewport {
    state: Mutex<ManualViewportState>,
}

impl ManualViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `intersecting` as the first signal when `region` is observed.
    pub fn set_initial(&self, region: &RegionId, intersecting: bool) {
        self.lock().initial.insert(region.clone(), intersecting);
    }

    /// Delivers to every observer of `region`. Returns `false` when none
    /// received the signal.
    pub fn emit(&self, region: &RegionId, intersecting: bool) -> bool {
        let state = self.lock();
        let Some(observers) = state.senders.get(region) else {
            return false;
        };
        let mut delivered = false;
        for (_, tx) in observers {
            delivered |= tx.send(intersecting).is_ok();
        }
        delivered
    }

    pub fn is_observed(&self, region: &RegionId) -> bool {
        self.observer_count(region) > 0
    }

    pub fn observer_count(&self, region: &RegionId) -> usize {
        self.lock().senders.get(region).map_or(0, Vec::len)
    }

    pub fn threshold(&self, region: &RegionId) -> Option<f32> {
        self.lock().thresholds.get(region).copied()
    }

    pub fn unobserve_count(&self, region: &RegionId) -> usize {
        self.lock()
            .unobserved
            .iter()
            .filter(|seen| *seen == region)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualViewportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ViewportSignal for ManualViewport {
    fn observe(&self, region: &RegionId, threshold: f32) -> Observation {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        if let Some(initial) = state.initial.get(region) {
            let _ = tx.send(*initial);
        }
        let id = ObserverId(state.next_observer);
        state.next_observer += 1;
        state.thresholds.insert(region.clone(), threshold);
        state
            .senders
            .entry(region.clone())
            .or_default()
            .push((id, tx));
        Observation {
            id,
            signals: UnboundedReceiverStream::new(rx).boxed(),
        }
    }

    fn unobserve(&self, region: &RegionId, observer: ObserverId) {
        let mut state = self.lock();
        if let Some(observers) = state.senders.get_mut(region) {
            observers.retain(|(id, _)| *id != observer);
            if observers.is_empty() {
                state.senders.remove(region);
            }
        }
        state.unobserved.push(region.clone());
    }
}

#[cfg(test)]
#[path = "tests/reveal_tests.rs"]
mod tests;
