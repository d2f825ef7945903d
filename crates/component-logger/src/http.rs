// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the logger service.
//!
//! One client serves both collaborators of the logger: settings are read with
//! a `GET` and batches are saved with a JSON `POST`.

use crate::config::LoggerConfig;
use crate::error::{ConfigError, SettingsError, SubmissionError};
use crate::settings::{ComponentLoggerSettings, SettingsProvider};
use crate::sink::{LogSink, SaveRequest};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use tracing::debug;

/// Endpoint returning the current user's logger settings.
const SETTINGS_ENDPOINT: &str = "/api/v1/logger/settings";
/// Endpoint accepting batches of log entries.
const ENTRIES_ENDPOINT: &str = "/api/v1/logger/entries";
const API_KEY_HEADER: &str = "X-API-KEY";

#[derive(Debug, Clone)]
pub struct HttpLoggerClient {
    client: Client,
    base_url: String,
}

impl HttpLoggerClient {
    pub fn new(config: &LoggerConfig) -> Result<Self, ConfigError> {
        let base_url = config.url.clone().ok_or(ConfigError::MissingUrl)?;

        let mut headers = HeaderMap::new();
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|e| ConfigError::HttpClient(e.to_string()))?,
        );
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key).map_err(|_| {
                ConfigError::InvalidConfig("API key contains invalid characters".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout);
        if let Some(proxy) = &config.https_proxy {
            builder = builder.proxy(
                reqwest::Proxy::https(proxy).map_err(|e| ConfigError::HttpClient(e.to_string()))?,
            );
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

async fn error_body(response: Response) -> String {
    response.text().await.unwrap_or_default()
}

#[async_trait]
impl SettingsProvider for HttpLoggerClient {
    async fn fetch_settings(&self) -> Result<ComponentLoggerSettings, SettingsError> {
        let response = self
            .client
            .get(self.url(SETTINGS_ENDPOINT))
            .send()
            .await
            .map_err(|e| SettingsError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SettingsError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        response
            .json::<ComponentLoggerSettings>()
            .await
            .map_err(|e| SettingsError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LogSink for HttpLoggerClient {
    async fn save(&self, request: &SaveRequest) -> Result<(), SubmissionError> {
        let body =
            serde_json::to_vec(request).map_err(|e| SubmissionError::Payload(e.to_string()))?;
        debug!(
            "Sending {} log entries ({} bytes)",
            request.component_log_entries.len(),
            body.len()
        );

        let response = self
            .client
            .post(self.url(ENTRIES_ENDPOINT))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| SubmissionError::Destination {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = error_body(response).await;
        debug!("{status}: Failed to save log entries: {message:?}");
        Err(SubmissionError::Destination {
            status: Some(status.as_u16()),
            message,
        })
    }
}
