// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log entries and the builder used to fill them in.

use crate::console::{capture_stack, ConsoleMirror};
use crate::context::ClientContext;
use crate::level::LoggingLevel;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Namespace put in front of the type name of errors raised locally, so they
/// can be told apart from errors reported by the logger backend.
pub const LOCAL_ERROR_TYPE_PREFIX: &str = "Rust.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryError {
    pub message: Option<String>,
    pub stack: Option<String>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

/// One log record, serialized the way the save endpoint expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(flatten)]
    pub context: ClientContext,
    pub error: Option<EntryError>,
    pub logging_level: LoggingLevel,
    pub message: Option<String>,
    pub record: Option<Value>,
    pub record_id: Option<String>,
    pub scenario: Option<String>,
    /// Call stack where the entry was created.
    pub stack: Option<String>,
    pub tags: Vec<String>,
    pub timestamp: String,
}

impl LogEntry {
    pub fn new(logging_level: LoggingLevel, context: ClientContext) -> Self {
        Self {
            context,
            error: None,
            logging_level,
            message: None,
            record: None,
            record_id: None,
            scenario: None,
            stack: None,
            tags: Vec::new(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Appends a tag unless it is already present.
    pub fn add_tag(&mut self, tag: String) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }
}

/// Error details reported by the logger backend for a failed remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteErrorBody {
    pub message: Option<String>,
    pub stack_trace: Option<String>,
    pub exception_type: Option<String>,
}

/// Anything that can be attached to an entry with
/// [`LogEntryBuilder::set_error`].
///
/// Remote-call failures carry a `body`; local errors carry `name`, `message`
/// and `stack`. When a body is present it wins and the other fields are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorLike {
    pub body: Option<RemoteErrorBody>,
    pub name: Option<String>,
    pub message: Option<String>,
    pub stack: Option<String>,
}

impl ErrorLike {
    pub fn remote(body: RemoteErrorBody) -> Self {
        Self {
            body: Some(body),
            ..Default::default()
        }
    }

    pub fn local(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Describes a Rust error: its type name, its message and its chain of
    /// sources in place of a stack.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let type_name = std::any::type_name::<E>();
        let name = type_name.rsplit("::").next().unwrap_or(type_name);
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        Self {
            body: None,
            name: Some(name.to_string()),
            message: Some(err.to_string()),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }

    fn to_entry_error(&self) -> EntryError {
        match &self.body {
            Some(body) => EntryError {
                message: body.message.clone(),
                stack: body.stack_trace.clone(),
                error_type: body.exception_type.clone(),
            },
            None => EntryError {
                message: self.message.clone(),
                stack: self.stack.clone(),
                error_type: Some(format!(
                    "{LOCAL_ERROR_TYPE_PREFIX}{}",
                    self.name.as_deref().unwrap_or("Error")
                )),
            },
        }
    }
}

/// Handle to an entry under construction.
///
/// Clones share the same entry: the logger keeps one clone in its buffer and
/// hands another to the caller, so changes made through the returned builder
/// are included when the buffer is saved.
#[derive(Clone)]
pub struct LogEntryBuilder {
    entry: Arc<Mutex<LogEntry>>,
    mirror: Option<ConsoleMirror>,
}

impl LogEntryBuilder {
    pub fn new(
        logging_level: LoggingLevel,
        context: ClientContext,
        mirror: Option<ConsoleMirror>,
    ) -> Self {
        let mut entry = LogEntry::new(logging_level, context);
        entry.stack = capture_stack();
        Self {
            entry: Arc::new(Mutex::new(entry)),
            mirror,
        }
    }

    fn with_entry<R>(&self, f: impl FnOnce(&mut LogEntry) -> R) -> R {
        #[allow(clippy::expect_used)]
        let mut entry = self.entry.lock().expect("lock poisoned");
        f(&mut entry)
    }

    /// Sets the message and echoes the entry to the console when enabled.
    pub fn set_message(&self, message: impl Into<String>) -> &Self {
        self.write_message(message.into());
        self.echo();
        self
    }

    pub(crate) fn write_message(&self, message: String) {
        self.with_entry(|entry| entry.message = Some(message));
    }

    /// Hands the entry to the console mirror, if any.
    pub(crate) fn echo(&self) {
        if let Some(mirror) = &self.mirror {
            mirror.mirror(Arc::clone(&self.entry));
        }
    }

    pub fn set_record_id(&self, record_id: impl Into<String>) -> &Self {
        let record_id = record_id.into();
        self.with_entry(|entry| entry.record_id = Some(record_id));
        self
    }

    /// Attaches a JSON copy of `record`. A value that cannot be represented
    /// as JSON leaves the record unset.
    pub fn set_record<T: Serialize + ?Sized>(&self, record: &T) -> &Self {
        let record = match serde_json::to_value(record) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("Ignoring record that cannot be serialized: {err}");
                None
            }
        };
        self.with_entry(|entry| entry.record = record);
        self
    }

    pub fn set_error(&self, error: &ErrorLike) -> &Self {
        let error = error.to_entry_error();
        self.with_entry(|entry| entry.error = Some(error));
        self
    }

    pub fn add_tag(&self, tag: impl Into<String>) -> &Self {
        let tag = tag.into();
        self.with_entry(|entry| entry.add_tag(tag));
        self
    }

    pub fn add_tags<I, S>(&self, tags: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.add_tag(tag);
        }
        self
    }

    pub(crate) fn set_scenario(&self, scenario: Option<String>) {
        self.with_entry(|entry| entry.scenario = scenario);
    }

    pub fn logging_level(&self) -> LoggingLevel {
        self.with_entry(|entry| entry.logging_level)
    }

    /// Copy of the entry as it currently stands.
    pub fn snapshot(&self) -> LogEntry {
        self.with_entry(|entry| entry.clone())
    }
}

impl Debug for LogEntryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEntryBuilder")
            .field("entry", &self.snapshot())
            .field("mirrored", &self.mirror.is_some())
            .finish()
    }
}
