//! HTTP seam between the view controllers and the remote site API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
    pub bearer_token: Option<String>,
    pub with_credentials: bool,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            body: None,
            bearer_token: None,
            with_credentials: false,
        }
    }

    pub fn post(url: Url, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url,
            body: Some(body),
            bearer_token: None,
            with_credentials: false,
        }
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport. Credentialed requests go through a client that
/// keeps a cookie store; anonymous ones never carry cookies.
pub struct ReqwestTransport {
    plain: Client,
    credentialed: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let plain = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        let credentialed = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("failed to build credentialed http client")?;
        Ok(Self {
            plain,
            credentialed,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = if request.with_credentials {
            &self.credentialed
        } else {
            &self.plain
        };
        let url = request.url.to_string();

        let mut builder = match request.method {
            Method::Get => client.get(request.url),
            Method::Post => client.post(request.url),
        };
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout { url: url.clone() }
            } else {
                TransportError::Send {
                    url: url.clone(),
                    reason: err.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| TransportError::Body {
            url,
            reason: err.to_string(),
        })?;

        Ok(HttpResponse { status, body })
    }
}
