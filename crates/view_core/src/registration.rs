use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::{
    domain::{EventId, SessionUser},
    protocol::{EventRegistrationRequest, RegistrationListing},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    endpoints::{Endpoints, Resource},
    error::ViewError,
    session::SessionProvider,
    transport::{HttpRequest, HttpTransport},
    Notification, ViewEvent,
};

/// Event ids the session user is registered for. Grows only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationSet {
    ids: HashSet<EventId>,
}

impl RegistrationSet {
    pub fn contains(&self, event_id: &EventId) -> bool {
        self.ids.contains(event_id)
    }

    pub fn insert(&mut self, event_id: EventId) -> bool {
        self.ids.insert(event_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn sorted(&self) -> Vec<EventId> {
        let mut ids: Vec<_> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl Extend<EventId> for RegistrationSet {
    fn extend<I: IntoIterator<Item = EventId>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    AlreadyRegistered,
}

pub struct EventRegistrationController {
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionProvider>,
    endpoints: Endpoints,
    fallback_message: String,
    with_credentials: bool,
    registered: Mutex<RegistrationSet>,
    events: broadcast::Sender<ViewEvent>,
}

impl EventRegistrationController {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionProvider>,
        endpoints: Endpoints,
        events: broadcast::Sender<ViewEvent>,
    ) -> Self {
        Self {
            transport,
            session,
            endpoints,
            fallback_message: crate::config::DEFAULT_FALLBACK_MESSAGE.to_string(),
            with_credentials: false,
            registered: Mutex::new(RegistrationSet::default()),
            events,
        }
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    pub fn is_registered(&self, event_id: &EventId) -> bool {
        self.lock().contains(event_id)
    }

    pub fn registered(&self) -> RegistrationSet {
        self.lock().clone()
    }

    pub fn fallback_message(&self) -> &str {
        &self.fallback_message
    }

    /// Loads the user's existing registrations into the set and returns the
    /// resulting set size. Any failure is logged and published as an error
    /// notice; the set keeps what it already had.
    pub async fn load(&self) -> Result<usize, ViewError> {
        let user = self.require_session("load_registrations").await?;

        match self.fetch_listing(&user).await {
            Ok(listing) => {
                let mut registered = self.lock();
                registered.extend(listing.event_ids());
                debug!(count = registered.len(), "registrations loaded");
                Ok(registered.len())
            }
            Err(err) => {
                warn!(user = %user.id, error = %err, "loading registrations failed");
                let _ = self.events.send(ViewEvent::Notice(Notification::error(
                    err.user_message(&self.fallback_message),
                )));
                Err(err)
            }
        }
    }

    async fn fetch_listing(&self, user: &SessionUser) -> Result<RegistrationListing, ViewError> {
        let mut url = self
            .endpoints
            .url_for(&Resource::Registrations)
            .map_err(|err| ViewError::MalformedResponse(err.to_string()))?;
        url.query_pairs_mut().append_pair("userId", user.id.as_str());

        let request = HttpRequest::get(url)
            .bearer(user.bearer_token.clone())
            .credentials(self.with_credentials);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ViewError::rejection(response.status, &response.body));
        }

        serde_json::from_str(&response.body)
            .map_err(|err| ViewError::MalformedResponse(err.to_string()))
    }

    pub async fn register(&self, event_id: &EventId) -> Result<RegistrationOutcome, ViewError> {
        let user = self.require_session("register_event").await?;
        if self.is_registered(event_id) {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        let url = self
            .endpoints
            .url_for(&Resource::EventRegistration(event_id.clone()))
            .map_err(|err| ViewError::MalformedResponse(err.to_string()))?;
        let body = serde_json::to_value(EventRegistrationRequest {
            event_id: event_id.clone(),
            user_id: user.id.clone(),
        })
        .map_err(|err| ViewError::MalformedResponse(err.to_string()))?;
        let request = HttpRequest::post(url, body)
            .bearer(user.bearer_token.clone())
            .credentials(self.with_credentials);

        let result = match self.transport.send(request).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(ViewError::rejection(response.status, &response.body)),
            Err(err) => Err(ViewError::from(err)),
        };

        match result {
            Ok(()) => {
                self.lock().insert(event_id.clone());
                info!(event = %event_id, user = %user.id, "registered for event");
                let _ = self.events.send(ViewEvent::Notice(Notification::success(
                    "Registered successfully!",
                )));
                Ok(RegistrationOutcome::Registered)
            }
            Err(err) => {
                warn!(event = %event_id, error = %err, "event registration failed");
                let _ = self.events.send(ViewEvent::Notice(Notification::error(
                    err.user_message(&self.fallback_message),
                )));
                Err(err)
            }
        }
    }

    async fn require_session(
        &self,
        action: &'static str,
    ) -> Result<SessionUser, ViewError> {
        match self.session.current_user().await {
            Some(user) => Ok(user),
            None => {
                let _ = self.events.send(ViewEvent::LoginRequired { action });
                Err(ViewError::Unauthenticated)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistrationSet> {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/registration_tests.rs"]
mod tests;
