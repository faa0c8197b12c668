use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use shared::protocol::decode_collection;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::ViewError,
    mount::MountGuard,
    transport::{HttpRequest, HttpTransport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Renderable state of one data source. Data is only present on success and
/// an error message only on error; the constructors are the only way in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState<T> {
    status: FetchStatus,
    data: Vec<T>,
    error_message: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> FetchState<T> {
    pub fn idle() -> Self {
        Self {
            status: FetchStatus::Idle,
            data: Vec::new(),
            error_message: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            status: FetchStatus::Loading,
            data: Vec::new(),
            error_message: None,
        }
    }

    pub fn success(data: Vec<T>) -> Self {
        Self {
            status: FetchStatus::Success,
            data,
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Error,
            data: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, FetchStatus::Success | FetchStatus::Error)
    }

    /// Success with no items: render the "nothing here yet" branch.
    pub fn is_empty_success(&self) -> bool {
        self.status == FetchStatus::Success && self.data.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub bearer_token: Option<String>,
    pub with_credentials: bool,
}

pub struct RemoteCollectionFetcher {
    transport: Arc<dyn HttpTransport>,
    fallback_message: String,
}

impl RemoteCollectionFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, fallback_message: impl Into<String>) -> Self {
        Self {
            transport,
            fallback_message: fallback_message.into(),
        }
    }

    /// Runs one load and always hands back a terminal state.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &Url,
        options: &FetchOptions,
    ) -> FetchState<T> {
        match self.load(endpoint, options).await {
            Ok(items) => {
                debug!(endpoint = %endpoint, items = items.len(), "collection loaded");
                FetchState::success(items)
            }
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "collection fetch failed");
                FetchState::error(err.user_message(&self.fallback_message))
            }
        }
    }

    async fn load<T: DeserializeOwned>(
        &self,
        endpoint: &Url,
        options: &FetchOptions,
    ) -> Result<Vec<T>, ViewError> {
        let request = HttpRequest::get(endpoint.clone())
            .bearer(options.bearer_token.clone())
            .credentials(options.with_credentials);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(ViewError::rejection(response.status, &response.body));
        }

        decode_collection(&response.body)
            .map_err(|err| ViewError::MalformedResponse(err.to_string()))
    }

    /// Starts the Idle -> Loading -> terminal lifecycle of one mount.
    ///
    /// `listener` sees every transition in order, starting with `Idle` before
    /// this returns. After [`FetchMount::unmount`] (or drop) it is never
    /// called again.
    pub fn mount<T, L>(
        self: &Arc<Self>,
        endpoint: Url,
        options: FetchOptions,
        mut listener: L,
    ) -> FetchMount<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
        L: FnMut(&FetchState<T>) + Send + 'static,
    {
        let guard = MountGuard::new();
        let (tx, state) = watch::channel(FetchState::idle());
        listener(&FetchState::idle());

        let fetcher = Arc::clone(self);
        let task_guard = guard.clone();
        guard.spawn(async move {
            let publish = |next: FetchState<T>, listener: &mut L| {
                task_guard.run_if_alive(|| {
                    listener(&next);
                    tx.send_replace(next);
                })
            };

            if publish(FetchState::loading(), &mut listener).is_none() {
                return;
            }
            let terminal = fetcher.fetch::<T>(&endpoint, &options).await;
            if publish(terminal, &mut listener).is_none() {
                debug!(endpoint = %endpoint, "discarding fetch result after unmount");
            }
        });

        FetchMount { guard, state }
    }
}

/// A mounted data source. Dropping it tears the mount down.
pub struct FetchMount<T> {
    guard: MountGuard,
    state: watch::Receiver<FetchState<T>>,
}

impl<T: Clone> FetchMount<T> {
    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.clone()
    }

    /// Waits for the terminal state. Returns the last published state when
    /// the mount is torn down first.
    pub async fn settled(&mut self) -> FetchState<T> {
        if let Ok(state) = self.state.wait_for(FetchState::is_terminal).await {
            return state.clone();
        }
        self.state.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.guard.is_alive()
    }

    pub fn unmount(&self) {
        self.guard.teardown();
    }
}

impl<T> Drop for FetchMount<T> {
    fn drop(&mut self) {
        self.guard.teardown();
    }
}

#[cfg(test)]
#[path = "tests/fetch_tests.rs"]
mod tests;
