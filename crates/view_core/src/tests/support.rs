use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::TransportError,
    transport::{HttpRequest, HttpResponse, HttpTransport},
};

#[derive(Clone)]
pub(crate) enum Scripted {
    Respond(u16, String),
    Unreachable,
}

/// Transport that answers from a script and records every request.
/// The last scripted answer repeats once the script runs out.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Scripted>,
    delay: Duration,
    pub(crate) requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub(crate) fn respond(status: u16, body: &str) -> Self {
        Self::from_script(vec![Scripted::Respond(status, body.to_string())])
    }

    pub(crate) fn unreachable() -> Self {
        Self::from_script(vec![Scripted::Unreachable])
    }

    pub(crate) fn from_script(script: Vec<Scripted>) -> Self {
        let last = script
            .last()
            .cloned()
            .unwrap_or(Scripted::Respond(200, "[]".to_string()));
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub(crate) fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().expect("requests lock").last().cloned()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_string();
        self.requests.lock().expect("requests lock").push(request);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| self.last.lock().expect("last lock").clone());

        match next {
            Scripted::Respond(status, body) => Ok(HttpResponse { status, body }),
            Scripted::Unreachable => Err(TransportError::Send {
                url,
                reason: "connection refused".to_string(),
            }),
        }
    }
}
