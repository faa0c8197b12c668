use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use url::Url;

use crate::{
    endpoints::{EndpointMap, Endpoints},
    reveal::RevealOptions,
    style::SectionStyles,
};

pub const DEFAULT_FALLBACK_MESSAGE: &str = "Something went wrong. Please try again later.";
pub const DEFAULT_CONFIG_PATH: &str = "site.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    /// No default: the API host is always deployment configuration.
    pub api_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub fallback_error_message: String,
    pub with_credentials: bool,
    pub reveal_threshold: f32,
    pub reveal_once: bool,
    pub endpoints: EndpointMap,
    pub sections: SectionStyles,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: 15,
            fallback_error_message: DEFAULT_FALLBACK_MESSAGE.into(),
            with_credentials: true,
            reveal_threshold: 0.1,
            reveal_once: true,
            endpoints: EndpointMap::default(),
            sections: SectionStyles::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    fallback_error_message: Option<String>,
    with_credentials: Option<bool>,
    reveal: Option<RevealFile>,
    endpoints: Option<EndpointMap>,
    sections: Option<SectionStyles>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RevealFile {
    threshold: Option<f32>,
    once: Option<bool>,
}

impl Settings {
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        let raw = self
            .api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| {
                anyhow!("api base url is not configured; set API_BASE_URL or api_base_url in site.toml")
            })?;
        let url = Url::parse(raw).with_context(|| format!("invalid api base url '{raw}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "api base url '{raw}' must use http or https, got '{}'",
                url.scheme()
            ));
        }
        Ok(url)
    }

    /// Rejects values that would make every request or observer misbehave.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be greater than zero"));
        }
        if !self.reveal_threshold.is_finite() {
            return Err(anyhow!(
                "reveal threshold must be a finite number, got {}",
                self.reveal_threshold
            ));
        }
        Ok(())
    }

    pub fn endpoints(&self) -> anyhow::Result<Endpoints> {
        Ok(Endpoints::new(self.api_base_url()?, self.endpoints.clone()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reveal_options(&self) -> RevealOptions {
        RevealOptions {
            threshold: self.reveal_threshold.clamp(0.0, 1.0),
            once: self.reveal_once,
        }
    }

    fn apply_file(&mut self, file: SettingsFile) {
        if let Some(v) = file.api_base_url {
            self.api_base_url = Some(v);
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file.fallback_error_message {
            self.fallback_error_message = v;
        }
        if let Some(v) = file.with_credentials {
            self.with_credentials = v;
        }
        if let Some(reveal) = file.reveal {
            if let Some(v) = reveal.threshold {
                self.reveal_threshold = v;
            }
            if let Some(v) = reveal.once {
                self.reveal_once = v;
            }
        }
        if let Some(v) = file.endpoints {
            self.endpoints = v;
        }
        if let Some(v) = file.sections {
            self.sections = v;
        }
    }

    /// Later names win, so `APP__*` beats the bare variable.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["API_BASE_URL", "APP__API_BASE_URL"] {
            if let Some(v) = lookup(key) {
                self.api_base_url = Some(v);
            }
        }

        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.request_timeout_secs = parsed;
            }
        }

        if let Some(v) = lookup("APP__FALLBACK_ERROR_MESSAGE") {
            self.fallback_error_message = v;
        }

        if let Some(v) = lookup("APP__WITH_CREDENTIALS") {
            if let Ok(parsed) = v.parse::<bool>() {
                self.with_credentials = parsed;
            }
        }

        if let Some(v) = lookup("APP__REVEAL_THRESHOLD") {
            if let Ok(parsed) = v.parse::<f32>() {
                self.reveal_threshold = parsed;
            }
        }
    }
}

/// Defaults, then `site.toml` (or `SITE_CONFIG`), then environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    let path = std::env::var("SITE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    load_settings_from(&path, |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let file: SettingsFile = toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        settings.apply_file(file);
    }

    settings.apply_env(env);
    settings
        .validate()
        .with_context(|| format!("invalid settings from '{}'", path.display()))?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
