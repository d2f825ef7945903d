// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the settings provider and the log sink.

use crate::error::{SettingsError, SubmissionError};
use crate::settings::{ComponentLoggerSettings, SettingsProvider, UserLoggingLevel};
use crate::sink::{LogSink, SaveMethod, SaveRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout, Duration};

/// Enabled settings with the given user ordinal and level ordinals.
pub(crate) fn settings_with(user_ordinal: i32, levels: &[(&str, i32)]) -> ComponentLoggerSettings {
    ComponentLoggerSettings {
        is_enabled: true,
        is_console_logging_enabled: false,
        default_save_method_name: Some(SaveMethod::EVENT_BUS),
        supported_logging_levels: levels
            .iter()
            .map(|(name, ordinal)| (name.to_string(), *ordinal))
            .collect(),
        user_logging_level: UserLoggingLevel {
            name: "USER".to_string(),
            ordinal: user_ordinal,
        },
    }
}

/// Polls `condition` until it holds, failing the test after one second.
pub(crate) async fn wait_for(condition: impl Fn() -> bool) {
    let result = timeout(Duration::from_secs(1), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for condition");
}

/// Holds calls until `release` is called once; later calls pass straight through.
#[derive(Debug)]
struct Gate(Semaphore);

impl Gate {
    fn new() -> Self {
        Gate(Semaphore::new(0))
    }

    async fn wait(&self) {
        let _permit = self.0.acquire().await;
    }

    fn release(&self) {
        self.0.add_permits(1);
    }
}

#[derive(Debug)]
pub(crate) struct StubSettingsProvider {
    result: Result<ComponentLoggerSettings, SettingsError>,
    gate: Option<Gate>,
    pub(crate) calls: AtomicUsize,
}

impl StubSettingsProvider {
    pub(crate) fn ok(settings: ComponentLoggerSettings) -> Self {
        Self {
            result: Ok(settings),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(error: SettingsError) -> Self {
        Self {
            result: Err(error),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_gate(mut self) -> Self {
        self.gate = Some(Gate::new());
        self
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.release();
        }
    }
}

#[async_trait]
impl SettingsProvider for StubSettingsProvider {
    async fn fetch_settings(&self) -> Result<ComponentLoggerSettings, SettingsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        self.result.clone()
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    failure: Mutex<Option<SubmissionError>>,
    requests: Mutex<Vec<SaveRequest>>,
    gate: Option<Gate>,
}

impl RecordingSink {
    pub(crate) fn failing(error: SubmissionError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Default::default()
        }
    }

    pub(crate) fn with_gate(mut self) -> Self {
        self.gate = Some(Gate::new());
        self
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.release();
        }
    }

    /// Makes every following save succeed.
    pub(crate) fn succeed(&self) {
        *self.failure.lock().expect("lock poisoned") = None;
    }

    pub(crate) fn requests(&self) -> Vec<SaveRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn save(&self, request: &SaveRequest) -> Result<(), SubmissionError> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(request.clone());
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        match self.failure.lock().expect("lock poisoned").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
