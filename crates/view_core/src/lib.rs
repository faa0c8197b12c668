use std::{sync::Arc, time::Duration};

use anyhow::Result;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

pub mod config;
pub mod endpoints;
pub mod error;
pub mod fetch;
pub mod form;
pub mod mount;
pub mod registration;
pub mod reveal;
pub mod session;
pub mod stagger;
pub mod style;
pub mod theme;
pub mod timer;
pub mod transport;

pub use config::{load_settings, Settings};
pub use endpoints::{EndpointMap, Endpoints, ListResource, Resource};
pub use error::{TransportError, ViewError};
pub use fetch::{FetchMount, FetchOptions, FetchState, FetchStatus, RemoteCollectionFetcher};
pub use form::{FormState, FormSubmissionController, SubmitFailure, SubmitReceipt};
pub use mount::MountGuard;
pub use registration::{EventRegistrationController, RegistrationOutcome, RegistrationSet};
pub use reveal::{
    DelayedReveal, ManualViewport, Observation, ObserverId, RegionId, RevealController,
    RevealHandle, RevealOptions, RevealState, ViewportSignal,
};
pub use session::{AnonymousSession, SessionProvider, StaticSession};
pub use stagger::{StaggerSchedule, StaggeredReveal};
pub use style::{ResolvedStyle, Section, SectionStyle, StyleResolver, Transform};
pub use theme::{ThemeState, ThemeStore};
pub use timer::{Timer, TokioTimer};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    pub dismissible: bool,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            dismissible: true,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            dismissible: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            dismissible: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    Notice(Notification),
    /// An action needs a session; the host should prompt for login.
    LoginRequired { action: &'static str },
    ThemeChanged(ThemeState),
}

/// Wiring of settings, collaborators and the shared theme for one page
/// session. Controllers handed out by it share its event bus.
pub struct ViewCore {
    settings: Settings,
    endpoints: Endpoints,
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionProvider>,
    viewport: Arc<dyn ViewportSignal>,
    timer: Arc<dyn Timer>,
    theme: ThemeStore,
    fetcher: Arc<RemoteCollectionFetcher>,
    events: broadcast::Sender<ViewEvent>,
}

impl ViewCore {
    /// Production wiring: reqwest transport and tokio timers. The viewport is
    /// the host's visibility source, e.g. a shared [`ManualViewport`].
    pub fn new(
        settings: Settings,
        session: Arc<dyn SessionProvider>,
        viewport: Arc<dyn ViewportSignal>,
    ) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(settings.request_timeout())?);
        Self::new_with_dependencies(
            settings,
            transport,
            session,
            viewport,
            Arc::new(TokioTimer::new()),
        )
    }

    pub fn new_with_dependencies(
        settings: Settings,
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionProvider>,
        viewport: Arc<dyn ViewportSignal>,
        timer: Arc<dyn Timer>,
    ) -> Result<Self> {
        settings.validate()?;
        let endpoints = settings.endpoints()?;
        let (events, _) = broadcast::channel(256);
        let fetcher = Arc::new(RemoteCollectionFetcher::new(
            Arc::clone(&transport),
            settings.fallback_error_message.clone(),
        ));
        Ok(Self {
            theme: ThemeStore::new().with_events(events.clone()),
            settings,
            endpoints,
            transport,
            session,
            viewport,
            timer,
            fetcher,
            events,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn viewport(&self) -> &Arc<dyn ViewportSignal> {
        &self.viewport
    }

    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    async fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            bearer_token: self
                .session
                .current_user()
                .await
                .and_then(|user| user.bearer_token),
            with_credentials: self.settings.with_credentials,
        }
    }

    pub async fn fetch_collection<T: ListResource>(&self) -> FetchState<T> {
        let resource = T::resource();
        let url = match self.endpoints.url_for(&resource) {
            Ok(url) => url,
            Err(err) => {
                warn!(resource = resource.name(), error = %err, "cannot resolve endpoint");
                return FetchState::error(self.settings.fallback_error_message.clone());
            }
        };
        let options = self.fetch_options().await;
        self.fetcher.fetch(&url, &options).await
    }

    /// Mounts a list section on the shared fetcher.
    pub async fn mount_collection<T, L>(&self, listener: L) -> Result<FetchMount<T>>
    where
        T: ListResource,
        L: FnMut(&FetchState<T>) + Send + 'static,
    {
        let url = self.endpoints.url_for(&T::resource())?;
        let options = self.fetch_options().await;
        Ok(self.fetcher.mount(url, options, listener))
    }

    pub fn contact_form(&self) -> Result<FormSubmissionController> {
        let url = self.endpoints.url_for(&Resource::ContactMessages)?;
        Ok(FormSubmissionController::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            url,
            FormState::with_fields(form::CONTACT_FIELDS),
            self.events.clone(),
        )
        .with_fallback_message(self.settings.fallback_error_message.clone())
        .with_credentials(self.settings.with_credentials))
    }

    pub fn registrations(&self) -> EventRegistrationController {
        EventRegistrationController::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            self.endpoints.clone(),
            self.events.clone(),
        )
        .with_fallback_message(self.settings.fallback_error_message.clone())
        .with_credentials(self.settings.with_credentials)
    }

    pub fn reveal_controller(&self) -> RevealController {
        RevealController::new(Arc::clone(&self.viewport))
    }

    /// Observes the section's region (named after the section) with the
    /// configured reveal options.
    pub fn observe_section(&self, section: Section) -> RevealHandle {
        self.reveal_controller().observe(
            RegionId::new(section.as_str()),
            self.settings.reveal_options(),
        )
    }

    pub fn delayed_reveal(&self, delay: Duration) -> DelayedReveal {
        DelayedReveal::after_delay(delay, Arc::clone(&self.timer))
    }

    pub fn staggered_reveal(&self, section: Section, count: usize) -> StaggeredReveal {
        let schedule =
            StaggerSchedule::new(count, self.settings.sections.get(section).base_interval());
        StaggeredReveal::start(&schedule, Arc::clone(&self.timer))
    }

    /// Style of item `index` in `section` under the current theme.
    pub fn section_style(&self, section: Section, is_revealed: bool, index: usize) -> ResolvedStyle {
        self.settings
            .sections
            .get(section)
            .resolve(self.theme.state(), is_revealed, index)
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
