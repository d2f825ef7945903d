// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::entry::LogEntry;
use crate::error::SubmissionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Hint telling the save endpoint how to persist a batch.
///
/// The logger only forwards it; any name the backend understands is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaveMethod(Cow<'static, str>);

impl SaveMethod {
    pub const EVENT_BUS: SaveMethod = SaveMethod(Cow::Borrowed("EVENT_BUS"));
    pub const QUEUEABLE: SaveMethod = SaveMethod(Cow::Borrowed("QUEUEABLE"));
    pub const REST: SaveMethod = SaveMethod(Cow::Borrowed("REST"));
    pub const SYNCHRONOUS_DML: SaveMethod = SaveMethod(Cow::Borrowed("SYNCHRONOUS_DML"));

    pub fn new(name: impl Into<String>) -> Self {
        SaveMethod(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SaveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a save call: the whole batch plus the save method to use for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub component_log_entries: Vec<LogEntry>,
    pub save_method_name: Option<SaveMethod>,
}

/// Remote endpoint that persists batches of entries. A batch is stored as a
/// whole or rejected as a whole.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn save(&self, request: &SaveRequest) -> Result<(), SubmissionError>;
}
