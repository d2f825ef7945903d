// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Line protocol of the relay.
//!
//! Each input line is one JSON object, either a log request
//! (`{"level": "info", "message": "...", "tags": [...]}`) or a command
//! (`{"command": "save"}`, `"flush"`, `"size"`, or `"scenario"` with a
//! `"scenario"` field).

use component_logger::level::ParseLevelError;
use component_logger::{ErrorLike, LoggerService, LoggingLevel, SaveMethod, SaveOutcome};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid request: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Level(#[from] ParseLevelError),

    #[error("the scenario command needs a non-empty \"scenario\" field")]
    MissingScenario,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Save,
    Flush,
    Size,
    Scenario,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRequest {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub record_id: Option<String>,
    pub record: Option<Value>,
    pub error: Option<ErrorLike>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    Command {
        command: Command,
        save_method: Option<SaveMethod>,
        scenario: Option<String>,
    },
    Entry(EntryRequest),
}

pub struct Relay {
    logger: LoggerService,
    save_method: Option<SaveMethod>,
}

impl Relay {
    pub fn new(logger: LoggerService, save_method: Option<SaveMethod>) -> Self {
        Self {
            logger,
            save_method,
        }
    }

    #[cfg(test)]
    pub fn logger(&self) -> &LoggerService {
        &self.logger
    }

    /// Handles one input line. Returns the text to print for commands that
    /// produce output.
    pub async fn handle_line(&self, line: &str) -> Result<Option<String>, RelayError> {
        let request: Request = serde_json::from_str(line)?;
        match request {
            Request::Entry(entry) => {
                self.log_entry(entry).await?;
                Ok(None)
            }
            Request::Command {
                command,
                save_method,
                scenario,
            } => match command {
                Command::Save => {
                    let outcome = self.save(save_method).await;
                    Ok(Some(describe(outcome)))
                }
                Command::Flush => {
                    self.logger.flush_buffer();
                    Ok(None)
                }
                Command::Size => Ok(Some(self.logger.get_buffer_size().to_string())),
                Command::Scenario => {
                    let scenario = scenario
                        .filter(|name| !name.trim().is_empty())
                        .ok_or(RelayError::MissingScenario)?;
                    self.logger.set_scenario(scenario);
                    Ok(None)
                }
            },
        }
    }

    async fn log_entry(&self, request: EntryRequest) -> Result<(), RelayError> {
        let level: LoggingLevel = request.level.parse()?;
        let builder = self.logger.log(level, request.message).await;
        builder.add_tags(request.tags);
        if let Some(record_id) = request.record_id {
            builder.set_record_id(record_id);
        }
        if let Some(record) = &request.record {
            builder.set_record(record);
        }
        if let Some(error) = &request.error {
            builder.set_error(error);
        }
        Ok(())
    }

    async fn save(&self, save_method: Option<SaveMethod>) -> SaveOutcome {
        self.logger
            .save_log(save_method.or_else(|| self.save_method.clone()))
            .await
    }

    /// Reads requests until the input ends, then saves what is left.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> SaveOutcome
    where
        R: AsyncBufRead + Unpin,
        W: std::io::Write,
    {
        let mut lines = input.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match self.handle_line(&line).await {
                Ok(Some(response)) => {
                    if let Err(e) = writeln!(output, "{response}") {
                        warn!("Failed to write response: {e}");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping line: {e}"),
            }
        }

        debug!("Input closed, saving remaining entries");
        let outcome = self.save(None).await;
        info!("{}", describe(outcome));
        outcome
    }
}

fn describe(outcome: SaveOutcome) -> String {
    match outcome {
        SaveOutcome::Empty => "nothing to save".to_string(),
        SaveOutcome::Saved(count) => format!("saved {count} entries"),
        SaveOutcome::Failed(count) => format!("failed to save {count} entries"),
    }
}
