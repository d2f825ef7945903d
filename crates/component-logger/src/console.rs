// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Local mirroring of log entries for developers.
//!
//! When the loaded settings enable console logging, every entry whose message
//! is set is echoed to a [`DiagnosticChannel`]: first a one-line message on a
//! stream matching the entry's level, then a collapsible details group with a
//! JSON snapshot of the entry and the call stack that produced it.

use crate::entry::LogEntry;
use crate::level::LoggingLevel;
use crate::settings::SettingsCache;
use serde::Serialize;
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, trace, warn};

/// Tracing target used by [`TracingConsole`].
pub const CONSOLE_TARGET: &str = "component_logger::console";

/// Nesting deeper than this is flattened in snapshots.
const MAX_SNAPSHOT_DEPTH: usize = 16;
const TRUNCATED_MARKER: &str = "[...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Error,
    Warn,
    Info,
    Debug,
}

impl From<LoggingLevel> for ConsoleStream {
    fn from(level: LoggingLevel) -> Self {
        match level {
            LoggingLevel::Error => ConsoleStream::Error,
            LoggingLevel::Warn => ConsoleStream::Warn,
            LoggingLevel::Info => ConsoleStream::Info,
            _ => ConsoleStream::Debug,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticRecord {
    Line {
        stream: ConsoleStream,
        message: String,
    },
    Details {
        stream: ConsoleStream,
        label: String,
        snapshot: Value,
        stack: Option<String>,
    },
    /// A batch could not be saved. `entries` holds every unsent entry.
    SubmissionFailed { error: String, entries: Value },
}

pub trait DiagnosticChannel: Send + Sync {
    fn emit(&self, record: DiagnosticRecord);
}

/// Writes diagnostic records as `tracing` events under [`CONSOLE_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl DiagnosticChannel for TracingConsole {
    fn emit(&self, record: DiagnosticRecord) {
        match record {
            DiagnosticRecord::Line { stream, message } => match stream {
                ConsoleStream::Error => error!(target: CONSOLE_TARGET, "{message}"),
                ConsoleStream::Warn => warn!(target: CONSOLE_TARGET, "{message}"),
                ConsoleStream::Info => info!(target: CONSOLE_TARGET, "{message}"),
                ConsoleStream::Debug => debug!(target: CONSOLE_TARGET, "{message}"),
            },
            DiagnosticRecord::Details {
                label,
                snapshot,
                stack,
                ..
            } => {
                debug!(target: CONSOLE_TARGET, entry = %snapshot, "{label}");
                if let Some(stack) = stack {
                    trace!(target: CONSOLE_TARGET, "{stack}");
                }
            }
            DiagnosticRecord::SubmissionFailed { error, entries } => {
                error!(target: CONSOLE_TARGET, "{error}");
                error!(target: CONSOLE_TARGET, entries = %entries, "Unsaved log entries");
            }
        }
    }
}

/// Keeps every record in memory, for hosts that render their own console.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::expect_used)]
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().expect("lock poisoned").clone()
    }

    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.records.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticChannel for MemoryChannel {
    #[allow(clippy::expect_used)]
    fn emit(&self, record: DiagnosticRecord) {
        self.records.lock().expect("lock poisoned").push(record);
    }
}

/// Serializes `value` for display. Never fails: a value serde cannot
/// represent becomes a placeholder string and deep nesting is flattened.
pub fn snapshot_value<T: Serialize + ?Sized>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(value) => truncate_depth(value, MAX_SNAPSHOT_DEPTH),
        Err(err) => {
            debug!("Could not snapshot value: {err}");
            Value::String(format!("<snapshot unavailable: {err}>"))
        }
    }
}

fn truncate_depth(value: Value, remaining: usize) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) if remaining == 0 => {
            Value::String(TRUNCATED_MARKER.to_string())
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| truncate_depth(item, remaining - 1))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, item)| (key, truncate_depth(item, remaining - 1)))
                .collect(),
        ),
        scalar => scalar,
    }
}

/// Call stack of the caller, captured whatever `RUST_BACKTRACE` says.
pub(crate) fn capture_stack() -> Option<String> {
    let backtrace = Backtrace::force_capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

/// Mirrors entries to a channel, gated by the cached settings.
#[derive(Clone)]
pub struct ConsoleMirror {
    settings: SettingsCache,
    channel: Arc<dyn DiagnosticChannel>,
}

impl ConsoleMirror {
    pub fn new(settings: SettingsCache, channel: Arc<dyn DiagnosticChannel>) -> Self {
        Self { settings, channel }
    }

    /// Echoes the entry once the settings allow it.
    ///
    /// Only settings that are loaded or already loading are consulted; the
    /// mirror never starts a fetch of its own. Inside a tokio runtime the work
    /// is spawned so the caller is never blocked; the entry is read when the
    /// task runs, so methods chained right after `set_message` show up in the
    /// details group.
    pub(crate) fn mirror(&self, entry: Arc<Mutex<LogEntry>>) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let settings = self.settings.clone();
                let channel = Arc::clone(&self.channel);
                runtime.spawn(async move {
                    let enabled = settings
                        .current()
                        .await
                        .map_or(false, |settings| settings.is_console_logging_enabled);
                    if enabled {
                        emit_entry(channel.as_ref(), &entry);
                    }
                });
            }
            Err(_) => {
                let enabled = self
                    .settings
                    .cached()
                    .map_or(false, |settings| settings.is_console_logging_enabled);
                if enabled {
                    emit_entry(self.channel.as_ref(), &entry);
                }
            }
        }
    }
}

fn emit_entry(channel: &dyn DiagnosticChannel, entry: &Mutex<LogEntry>) {
    let entry = match entry.lock() {
        Ok(entry) => entry.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    let stream = ConsoleStream::from(entry.logging_level);
    let message = entry.message.clone().unwrap_or_default();

    channel.emit(DiagnosticRecord::Line {
        stream,
        message: message.clone(),
    });
    channel.emit(DiagnosticRecord::Details {
        stream,
        label: format!("Details for: {message}"),
        snapshot: snapshot_value(&entry),
        stack: entry.stack.clone(),
    });
}
