use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};
use url::Url;

use crate::{
    error::ViewError,
    session::SessionProvider,
    transport::{HttpRequest, HttpTransport},
    Notification, ViewEvent,
};

pub const CONTACT_FIELDS: [&str; 4] = ["name", "email", "subject", "message"];

/// Field name -> current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormState {
    fields: BTreeMap<String, String>,
}

impl FormState {
    pub fn with_fields<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            fields: names
                .into_iter()
                .map(|name| (name.to_string(), String::new()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_blank(&self) -> bool {
        self.fields.values().all(String::is_empty)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
                .collect(),
        )
    }

    /// Blanks every value; the field names stay registered.
    pub fn clear_values(&mut self) {
        for value in self.fields.values_mut() {
            value.clear();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubmitFailure {
    pub cause: ViewError,
    pub message: String,
}

impl SubmitFailure {
    pub fn is_unauthenticated(&self) -> bool {
        self.cause.requires_login()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Contact-style form: field edits, submission, reset on success.
///
/// Submissions are not deduplicated. Callers that need single-flight should
/// disable their submit control while [`FormSubmissionController::in_flight`]
/// is non-zero.
pub struct FormSubmissionController {
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionProvider>,
    endpoint: Url,
    fallback_message: String,
    success_message: String,
    with_credentials: bool,
    fields: Mutex<FormState>,
    in_flight: AtomicUsize,
    events: broadcast::Sender<ViewEvent>,
}

impl FormSubmissionController {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionProvider>,
        endpoint: Url,
        initial: FormState,
        events: broadcast::Sender<ViewEvent>,
    ) -> Self {
        Self {
            transport,
            session,
            endpoint,
            fallback_message: crate::config::DEFAULT_FALLBACK_MESSAGE.to_string(),
            success_message: "Message sent successfully!".to_string(),
            with_credentials: false,
            fields: Mutex::new(initial),
            in_flight: AtomicUsize::new(0),
            events,
        }
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    pub fn update_field(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock_fields().set(name, value);
    }

    pub fn snapshot(&self) -> FormState {
        self.lock_fields().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn submit(&self) -> Result<SubmitReceipt, SubmitFailure> {
        let Some(user) = self.session.current_user().await else {
            let _ = self.events.send(ViewEvent::LoginRequired {
                action: "submit_form",
            });
            return Err(self.failure(ViewError::Unauthenticated));
        };

        let request = HttpRequest::post(self.endpoint.clone(), self.snapshot().to_json())
            .bearer(user.bearer_token.clone())
            .credentials(self.with_credentials);

        let response = {
            let _pending = InFlight::enter(&self.in_flight);
            self.transport.send(request).await
        };

        let outcome = match response {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(ViewError::rejection(response.status, &response.body)),
            Err(err) => Err(ViewError::from(err)),
        };

        match outcome {
            Ok(response) => {
                self.lock_fields().clear_values();
                let message = shared::error::server_message(&response.body)
                    .unwrap_or_else(|| self.success_message.clone());
                info!(endpoint = %self.endpoint, user = %user.id, "form submitted");
                let _ = self
                    .events
                    .send(ViewEvent::Notice(Notification::success(message.clone())));
                Ok(SubmitReceipt {
                    status: response.status,
                    message,
                })
            }
            Err(cause) => {
                warn!(endpoint = %self.endpoint, error = %cause, "form submission failed");
                let failure = self.failure(cause);
                let _ = self
                    .events
                    .send(ViewEvent::Notice(Notification::error(failure.message.clone())));
                Err(failure)
            }
        }
    }

    fn failure(&self, cause: ViewError) -> SubmitFailure {
        SubmitFailure {
            message: cause.user_message(&self.fallback_message),
            cause,
        }
    }

    fn lock_fields(&self) -> std::sync::MutexGuard<'_, FormState> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
