// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logging levels understood by the logger settings endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the seven severities an entry can be created with, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoggingLevel {
    Error,
    Warn,
    Info,
    Debug,
    Fine,
    Finer,
    Finest,
}

impl LoggingLevel {
    pub const ALL: [LoggingLevel; 7] = [
        LoggingLevel::Error,
        LoggingLevel::Warn,
        LoggingLevel::Info,
        LoggingLevel::Debug,
        LoggingLevel::Fine,
        LoggingLevel::Finer,
        LoggingLevel::Finest,
    ];

    /// Name used as the key in the settings' supported level map and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggingLevel::Error => "ERROR",
            LoggingLevel::Warn => "WARN",
            LoggingLevel::Info => "INFO",
            LoggingLevel::Debug => "DEBUG",
            LoggingLevel::Fine => "FINE",
            LoggingLevel::Finer => "FINER",
            LoggingLevel::Finest => "FINEST",
        }
    }
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown logging level: {0}")]
pub struct ParseLevelError(String);

impl FromStr for LoggingLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        LoggingLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseLevelError(trimmed.to_string()))
    }
}
