// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client-side logger for UI components.
//!
//! Components create entries through a [`LoggerService`]; entries the
//! current user's settings accept are buffered and sent to the logger
//! service in one batch by [`LoggerService::save_log`].
//!
//! ```no_run
//! use component_logger::{LoggerConfig, LoggerService};
//!
//! # async fn run() -> Result<(), component_logger::ConfigError> {
//! let logger = LoggerService::from_config(&LoggerConfig::from_env()?)?;
//! logger
//!     .error("Could not save the order")
//!     .await
//!     .set_record_id("8015g00000AbCdE")
//!     .add_tags(["checkout", "orders"]);
//! logger.save_log(None).await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod console;
pub mod context;
pub mod entry;
pub mod error;
pub mod http;
pub mod level;
pub mod service;
pub mod settings;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use config::LoggerConfig;
pub use console::{DiagnosticChannel, DiagnosticRecord, MemoryChannel, TracingConsole};
pub use context::{ClientContext, EnvironmentProvider, ProcessEnvironment, StaticEnvironment};
pub use entry::{ErrorLike, LogEntry, LogEntryBuilder, RemoteErrorBody};
pub use error::{ConfigError, SettingsError, SubmissionError};
pub use http::HttpLoggerClient;
pub use level::LoggingLevel;
pub use service::{LoggerService, SaveOutcome};
pub use settings::{ComponentLoggerSettings, SettingsCache, SettingsProvider};
pub use sink::{LogSink, SaveMethod, SaveRequest};
