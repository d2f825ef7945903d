// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::env;

/// Details about the client that created an entry.
///
/// Every field is optional: an unknown value is sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    #[serde(rename = "browserFormFactor")]
    pub form_factor: Option<String>,
    #[serde(rename = "browserLanguage")]
    pub language: Option<String>,
    #[serde(rename = "browserScreenResolution")]
    pub screen_resolution: Option<String>,
    #[serde(rename = "browserUrl")]
    pub url: Option<String>,
    #[serde(rename = "browserUserAgent")]
    pub user_agent: Option<String>,
    #[serde(rename = "browserWindowResolution")]
    pub window_resolution: Option<String>,
}

pub trait EnvironmentProvider: Send + Sync {
    fn client_context(&self) -> ClientContext;
}

/// Always reports the same context. Useful for hosts that know their
/// environment up front, and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment(pub ClientContext);

impl EnvironmentProvider for StaticEnvironment {
    fn client_context(&self) -> ClientContext {
        self.0.clone()
    }
}

/// Describes the current process: locale from `LANG`, terminal size from
/// `COLUMNS`/`LINES` and the crate version as user agent.
#[derive(Debug, Clone)]
pub struct ProcessEnvironment {
    form_factor: String,
    url: Option<String>,
}

impl Default for ProcessEnvironment {
    fn default() -> Self {
        Self {
            form_factor: "Large".to_string(),
            url: env::var("COMPONENT_LOGGER_CLIENT_URL").ok(),
        }
    }
}

impl ProcessEnvironment {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl EnvironmentProvider for ProcessEnvironment {
    fn client_context(&self) -> ClientContext {
        let window_resolution = match (env::var("COLUMNS"), env::var("LINES")) {
            (Ok(columns), Ok(lines)) => Some(format_resolution(&columns, &lines)),
            _ => None,
        };
        ClientContext {
            form_factor: Some(self.form_factor.clone()),
            language: env::var("LANG").ok().and_then(|lang| parse_language_tag(&lang)),
            screen_resolution: None,
            url: self.url.clone(),
            user_agent: Some(format!(
                "{}/{} ({})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                env::consts::OS
            )),
            window_resolution,
        }
    }
}

fn format_resolution(width: &str, height: &str) -> String {
    format!("{} x {}", width.trim(), height.trim())
}

/// Turns a POSIX locale such as `en_US.UTF-8` into a language tag (`en-US`).
fn parse_language_tag(locale: &str) -> Option<String> {
    let tag = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .replace('_', "-");
    match tag.as_str() {
        "" | "C" | "POSIX" => None,
        _ => Some(tag),
    }
}
