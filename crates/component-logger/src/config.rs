// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ConfigError;
use crate::sink::SaveMethod;
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 5;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the HTTP-backed logger
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Base URL of the logger service (scheme + host, optional path prefix)
    pub url: Option<String>,
    /// API key sent with every request
    pub api_key: Option<String>,
    /// Timeout applied to settings and save requests
    pub timeout: Duration,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// Save method used instead of the one from the user's settings
    pub save_method: Option<SaveMethod>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            https_proxy: None,
            log_level: "info".to_string(),
            save_method: None,
        }
    }
}

impl LoggerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from any key lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());

        let timeout = match non_empty("COMPONENT_LOGGER_TIMEOUT_SECS") {
            Some(val) => val.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                ConfigError::InvalidConfig(format!(
                    "COMPONENT_LOGGER_TIMEOUT_SECS must be a number of seconds, got '{val}'"
                ))
            })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let config = Self {
            url: non_empty("COMPONENT_LOGGER_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string()),
            api_key: non_empty("COMPONENT_LOGGER_API_KEY").map(|key| key.trim().to_string()),
            timeout,
            https_proxy: non_empty("COMPONENT_LOGGER_HTTPS_PROXY")
                .or_else(|| non_empty("HTTPS_PROXY")),
            log_level: non_empty("COMPONENT_LOGGER_LOG_LEVEL")
                .map(|val| val.trim().to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
            save_method: non_empty("COMPONENT_LOGGER_SAVE_METHOD")
                .map(|val| SaveMethod::new(val.trim().to_uppercase())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(url) = &self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidConfig(format!(
                    "COMPONENT_LOGGER_URL must be an http(s) URL, got '{url}'"
                )));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}
