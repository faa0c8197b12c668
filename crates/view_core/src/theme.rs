use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::{style::Palette, ViewEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ThemeState {
    pub is_dark_mode: bool,
}

impl ThemeState {
    pub fn palette(&self) -> &'static Palette {
        crate::style::palette_for(self.is_dark_mode)
    }
}

/// Process-wide dark/light flag. Clones share the same state.
///
/// `toggle` is the only writer. Every receiver returned by `subscribe`
/// observes the new value by the time `toggle` returns.
#[derive(Clone)]
pub struct ThemeStore {
    state: Arc<watch::Sender<ThemeState>>,
    events: Option<broadcast::Sender<ViewEvent>>,
}

impl Default for ThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeStore {
    pub fn new() -> Self {
        Self::with_mode(false)
    }

    pub fn with_mode(is_dark_mode: bool) -> Self {
        let (state, _) = watch::channel(ThemeState { is_dark_mode });
        Self {
            state: Arc::new(state),
            events: None,
        }
    }

    pub fn with_events(mut self, events: broadcast::Sender<ViewEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> bool {
        self.state.borrow().is_dark_mode
    }

    pub fn snapshot(&self) -> ThemeState {
        *self.state.borrow()
    }

    pub fn toggle(&self) {
        self.state.send_modify(|state| state.is_dark_mode = !state.is_dark_mode);
        let current = self.snapshot();
        debug!(is_dark_mode = current.is_dark_mode, "theme toggled");
        if let Some(events) = &self.events {
            let _ = events.send(ViewEvent::ThemeChanged(current));
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeState> {
        self.state.subscribe()
    }
}
