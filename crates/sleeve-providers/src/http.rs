// SPDX-License-Identifier: GPL-3.0-or-later

//! Request plumbing shared by every adapter: per-provider settings, queued
//! dispatch and response classification.

use crate::error::{ProviderError, Result};
use crate::rate_limiter::RequestQueues;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub use sleeve_domain::DEFAULT_USER_AGENT;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Stored without a trailing slash.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ProviderSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Replace the base URL only when an override is configured.
    pub fn base_url_override(mut self, base_url: Option<&str>) -> Self {
        if let Some(base_url) = base_url.map(str::trim).filter(|url| !url.is_empty()) {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn api_key(mut self, api_key: Option<impl Into<String>>) -> Self {
        self.api_key = api_key
            .map(Into::into)
            .map(|key: String| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP access for a single named provider. Every request goes through that
/// provider's queue.
#[derive(Debug, Clone)]
pub struct ProviderHttp {
    name: &'static str,
    client: Client,
    queues: RequestQueues,
    settings: ProviderSettings,
}

impl ProviderHttp {
    pub fn new(
        name: &'static str,
        client: Client,
        queues: RequestQueues,
        settings: ProviderSettings,
    ) -> Self {
        Self {
            name,
            client,
            queues,
            settings,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn api_key(&self) -> Option<&str> {
        self.settings.api_key.as_deref()
    }

    /// `path` is appended to the base URL and must start with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .timeout(self.settings.timeout)
            .header(reqwest::header::USER_AGENT, &self.settings.user_agent)
    }

    /// Dispatch `request` on this provider's queue and return the parsed body.
    pub async fn send_json(&self, request: RequestBuilder) -> Result<Value> {
        self.queues
            .enqueue(self.name, execute(self.name, request))
            .await?
    }

    pub async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let value = self.send_json(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// True (and logged) when the caller gave up; adapters stop between steps.
    pub fn cancelled(&self, token: &CancellationToken, step: &str) -> bool {
        let cancelled = token.is_cancelled();
        if cancelled {
            debug!(target: "providers", provider = self.name, step, "cancelled before request");
        }
        cancelled
    }
}

async fn execute(provider: &'static str, request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    trace!(target: "providers", provider, %status, "response received");
    let body = response.text().await?;
    parse_body(status, &body)
}

/// Classify a response: non-2xx statuses and 2xx payloads carrying an API
/// error both become errors.
pub fn parse_body(status: StatusCode, body: &str) -> Result<Value> {
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status,
            body: body.chars().take(512).collect(),
        });
    }

    let value: Value = serde_json::from_str(body)?;
    if let Some(message) = api_error_message(&value) {
        return Err(ProviderError::Api { message });
    }

    Ok(value)
}

fn api_error_message(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    match object.get("error") {
        Some(Value::String(message)) => return Some(message.clone()),
        Some(Value::Object(error)) => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Some(message.to_string());
        }
        Some(Value::Number(code)) => {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("error code {code}"));
            return Some(message);
        }
        _ => {}
    }

    // A bare `{"message": ..}` is an error envelope; real payloads carry more keys.
    if object.len() == 1 {
        if let Some(message) = object.get("message").and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }

    None
}

/// Convert an adapter outcome into the "no result" contract, logging what was
/// swallowed.
pub fn settle<T>(provider: &str, operation: &str, outcome: Result<Option<T>>) -> Option<T> {
    match outcome {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            debug!(target: "providers", provider, operation, "no match");
            None
        }
        Err(error) if error.is_not_found() => {
            debug!(target: "providers", provider, operation, error = %error, "not found");
            None
        }
        Err(error) => {
            warn!(target: "providers", provider, operation, error = %error, "provider request failed");
            None
        }
    }
}
