// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors returned by a [`crate::settings::SettingsProvider`].
///
/// The settings fetch is shared by every caller waiting on it, so the error
/// is `Clone` and carries rendered messages instead of source errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("settings request failed: {0}")]
    Transport(String),

    #[error("settings endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode settings: {0}")]
    Decode(String),
}

/// Errors returned by a [`crate::sink::LogSink`] when a batch is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("failed to prepare payload: {0}")]
    Payload(String),

    #[error("error shipping log entries: {status:?} {message}")]
    Destination {
        status: Option<u16>,
        message: String,
    },
}

impl SubmissionError {
    /// A 4xx response means the same batch would be rejected again.
    pub fn is_permanent(&self) -> bool {
        match self {
            SubmissionError::Payload(_) => true,
            SubmissionError::Destination { status, .. } => {
                status.map_or(false, |code| (400..500).contains(&code))
            }
        }
    }
}

/// Errors that can occur when building a logger from configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("COMPONENT_LOGGER_URL is required to reach the logger service")]
    MissingUrl,

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}
