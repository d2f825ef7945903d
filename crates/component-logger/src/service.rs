// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The logger service: creates entries, buffers the accepted ones, and saves
//! them in batches.
//!
//! Every creation method waits for the user's settings (fetched once and then
//! cached), decides whether the entry is kept, and always hands back a
//! builder so calls can be chained the same way whether or not the entry was
//! kept. Nothing is sent until [`LoggerService::save_log`] is called.
//!
//! Saving takes the whole buffer at the moment the save starts. Entries
//! created while the batch is in flight stay in the buffer for the next save.
//! When the batch is rejected its entries go back to the front of the buffer,
//! unless [`LoggerService::flush_buffer`] discarded the buffer in the meantime.

use crate::config::LoggerConfig;
use crate::console::{snapshot_value, ConsoleMirror, DiagnosticChannel, DiagnosticRecord, TracingConsole};
use crate::context::{EnvironmentProvider, ProcessEnvironment};
use crate::entry::LogEntryBuilder;
use crate::error::ConfigError;
use crate::http::HttpLoggerClient;
use crate::level::LoggingLevel;
use crate::settings::{ComponentLoggerSettings, SettingsCache, SettingsProvider};
use crate::sink::{LogSink, SaveMethod, SaveRequest};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Result of [`LoggerService::save_log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The buffer was empty; nothing was sent.
    Empty,
    /// This many entries were saved and removed from the buffer.
    Saved(usize),
    /// The batch of this many entries was rejected and kept in the buffer.
    Failed(usize),
}

#[derive(Default)]
struct BufferState {
    entries: Vec<LogEntryBuilder>,
    scenario: Option<String>,
    /// Bumped by every `flush_buffer` so a failed save knows whether its
    /// entries may be put back.
    generation: u64,
    /// Bumped by every `set_scenario`; `stamped_scenario` is the value it
    /// stamped. A failed batch missed any stamp made while it was in flight.
    scenario_revision: u64,
    stamped_scenario: Option<String>,
}

#[derive(Clone)]
pub struct LoggerService {
    settings: SettingsCache,
    sink: Arc<dyn LogSink>,
    channel: Arc<dyn DiagnosticChannel>,
    environment: Arc<dyn EnvironmentProvider>,
    state: Arc<Mutex<BufferState>>,
}

impl LoggerService {
    pub fn new(settings_provider: Arc<dyn SettingsProvider>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            settings: SettingsCache::new(settings_provider),
            sink,
            channel: Arc::new(TracingConsole),
            environment: Arc::new(ProcessEnvironment::default()),
            state: Arc::new(Mutex::new(BufferState::default())),
        }
    }

    /// Builds a service talking to the logger HTTP API described by `config`.
    pub fn from_config(config: &LoggerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = Arc::new(HttpLoggerClient::new(config)?);
        Ok(Self::new(client.clone(), client))
    }

    pub fn with_diagnostic_channel(mut self, channel: Arc<dyn DiagnosticChannel>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentProvider>) -> Self {
        self.environment = environment;
        self
    }

    #[allow(clippy::expect_used)]
    fn lock_state(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().expect("lock poisoned")
    }

    /// Returns the current user's settings, loading them on first use.
    ///
    /// `None` means the settings could not be loaded; the failure is logged
    /// and the next call tries again.
    pub async fn get_user_settings(&self) -> Option<Arc<ComponentLoggerSettings>> {
        self.settings.get().await.ok()
    }

    /// Sets the scenario of every buffered entry and of every entry created
    /// from now on.
    pub fn set_scenario(&self, scenario: impl Into<String>) {
        let scenario = scenario.into();
        let mut state = self.lock_state();
        for entry in &state.entries {
            entry.set_scenario(Some(scenario.clone()));
        }
        state.scenario_revision = state.scenario_revision.wrapping_add(1);
        state.stamped_scenario = Some(scenario.clone());
        state.scenario = Some(scenario);
    }

    /// Stops stamping a scenario on new entries. Buffered entries keep theirs.
    pub fn clear_scenario(&self) {
        self.lock_state().scenario = None;
    }

    pub fn scenario(&self) -> Option<String> {
        self.lock_state().scenario.clone()
    }

    pub async fn error(&self, message: impl Into<String>) -> LogEntryBuilder {
        self.log(LoggingLevel::Error, message).await
    }

    pub async fn warn(&self, message: impl Into<String>) -> LogEntryBuilder {
        self.log(LoggingLevel::Warn, message).await
    }

    pub async fn info(&self, message: impl Into<String>) -> LogEntryBuilder {
        self.log(LoggingLevel::Info, message).await
    }

    pub async fn debug(&self, message: impl Into<String>) -> LogEntryBuilder {
        self.log(LoggingLevel::Debug, message).await
    }

    pub async fn fine(&self, message: impl Into<String>) -> LogEntryBuilder {
        self.log(LoggingLevel::Fine, message).await
    }

    pub async fn finer(&self, message: impl Into<String>) -> LogEntryBuilder {
        self.log(LoggingLevel::Finer, message).await
    }

    pub async fn finest(&self, message: impl Into<String>) -> LogEntryBuilder {
        self.log(LoggingLevel::Finest, message).await
    }

    /// Creates an entry at `level`. The entry is buffered only when the
    /// user's settings accept the level; if the settings cannot be loaded the
    /// entry is treated as rejected.
    pub async fn log(&self, level: LoggingLevel, message: impl Into<String>) -> LogEntryBuilder {
        let message = message.into();
        let should_save = self
            .settings
            .get()
            .await
            .map_or(false, |settings| settings.meets_user_logging_level(level));

        let builder = LogEntryBuilder::new(
            level,
            self.environment.client_context(),
            Some(ConsoleMirror::new(
                self.settings.clone(),
                Arc::clone(&self.channel),
            )),
        );

        builder.write_message(message);
        {
            let mut state = self.lock_state();
            if let Some(scenario) = &state.scenario {
                builder.set_scenario(Some(scenario.clone()));
            }
            if should_save {
                state.entries.push(builder.clone());
            }
            debug!(
                "Created {level} entry (kept: {should_save}, buffer size: {})",
                state.entries.len()
            );
        }
        // The channel may call back into the service.
        builder.echo();
        builder
    }

    /// Number of entries created but not yet saved.
    pub fn get_buffer_size(&self) -> usize {
        self.lock_state().entries.len()
    }

    /// Discards every buffered entry without saving it.
    pub fn flush_buffer(&self) {
        let mut state = self.lock_state();
        state.entries.clear();
        state.generation = state.generation.wrapping_add(1);
    }

    /// Saves every buffered entry in one batch.
    ///
    /// `save_method` applies to this call only; without it the default save
    /// method from the user's settings is used. A rejected batch is kept in
    /// the buffer and, when console logging is enabled, reported with all of
    /// its entries to the diagnostic channel.
    pub async fn save_log(&self, save_method: Option<SaveMethod>) -> SaveOutcome {
        if self.get_buffer_size() == 0 {
            return SaveOutcome::Empty;
        }

        let settings = self.settings.get().await.ok();
        let save_method_name = save_method.or_else(|| {
            settings
                .as_ref()
                .and_then(|settings| settings.default_save_method_name.clone())
        });

        let (batch, generation, scenario_revision) = {
            let mut state = self.lock_state();
            (
                std::mem::take(&mut state.entries),
                state.generation,
                state.scenario_revision,
            )
        };
        // Another save may have taken the buffer while settings were loading.
        if batch.is_empty() {
            return SaveOutcome::Empty;
        }

        let count = batch.len();
        let request = SaveRequest {
            component_log_entries: batch.iter().map(LogEntryBuilder::snapshot).collect(),
            save_method_name,
        };
        debug!(
            "Saving {count} log entries with save method {:?}",
            request.save_method_name
        );

        match self.sink.save(&request).await {
            Ok(()) => {
                debug!("Successfully saved {count} log entries");
                SaveOutcome::Saved(count)
            }
            Err(err) => {
                let console_enabled = settings
                    .as_ref()
                    .map_or(false, |settings| settings.is_console_logging_enabled);
                if console_enabled {
                    self.channel.emit(DiagnosticRecord::SubmissionFailed {
                        error: err.to_string(),
                        entries: snapshot_value(&request.component_log_entries),
                    });
                } else {
                    debug!("Failed to save {count} log entries: {err}");
                }
                if err.is_permanent() {
                    warn!("Log entries were rejected and will fail again until the buffer is flushed: {err}");
                }

                let mut state = self.lock_state();
                if state.generation == generation {
                    if state.scenario_revision != scenario_revision {
                        for entry in &batch {
                            entry.set_scenario(state.stamped_scenario.clone());
                        }
                    }
                    let newer = std::mem::replace(&mut state.entries, batch);
                    state.entries.extend(newer);
                } else {
                    debug!("Buffer was flushed during the save; dropping {count} unsaved entries");
                }
                SaveOutcome::Failed(count)
            }
        }
    }
}

impl Debug for LoggerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerService")
            .field("settings", &self.settings)
            .field("buffer_size", &self.get_buffer_size())
            .field("scenario", &self.scenario())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MemoryChannel;
    use crate::context::{ClientContext, StaticEnvironment};
    use crate::error::{SettingsError, SubmissionError};
    use crate::test_support::{settings_with, wait_for, RecordingSink, StubSettingsProvider};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tracing_test::traced_test;

    const LEVELS: &[(&str, i32)] = &[
        ("ERROR", 1),
        ("WARN", 2),
        ("INFO", 3),
        ("DEBUG", 4),
        ("FINE", 5),
        ("FINER", 6),
        ("FINEST", 7),
    ];

    struct Fixture {
        service: LoggerService,
        provider: Arc<StubSettingsProvider>,
        sink: Arc<RecordingSink>,
        channel: Arc<MemoryChannel>,
    }

    fn fixture_with(provider: StubSettingsProvider, sink: RecordingSink) -> Fixture {
        let provider = Arc::new(provider);
        let sink = Arc::new(sink);
        let channel = Arc::new(MemoryChannel::new());
        let service = LoggerService::new(provider.clone(), sink.clone())
            .with_diagnostic_channel(channel.clone())
            .with_environment(Arc::new(StaticEnvironment(ClientContext {
                url: Some("app://test".to_string()),
                ..Default::default()
            })));
        Fixture {
            service,
            provider,
            sink,
            channel,
        }
    }

    fn fixture(user_ordinal: i32) -> Fixture {
        fixture_with(
            StubSettingsProvider::ok(settings_with(user_ordinal, LEVELS)),
            RecordingSink::default(),
        )
    }

    fn console_fixture(sink: RecordingSink) -> Fixture {
        let mut settings = settings_with(1, LEVELS);
        settings.is_console_logging_enabled = true;
        fixture_with(StubSettingsProvider::ok(settings), sink)
    }

    #[tokio::test]
    async fn test_acceptance_follows_user_ordinal() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(
                3,
                &[("ERROR", 1), ("WARN", 2), ("INFO", 3), ("DEBUG", 4)],
            )),
            RecordingSink::default(),
        );
        f.service.error("x").await;
        f.service.info("y").await;
        f.service.debug("z").await;
        assert_eq!(f.service.get_buffer_size(), 2);
    }

    #[tokio::test]
    async fn test_each_level_method_creates_its_level() {
        let f = fixture(1);
        let s = &f.service;
        let builders = vec![
            s.error("e").await,
            s.warn("w").await,
            s.info("i").await,
            s.debug("d").await,
            s.fine("f").await,
            s.finer("fr").await,
            s.finest("fs").await,
        ];
        let levels: Vec<_> = builders.iter().map(LogEntryBuilder::logging_level).collect();
        assert_eq!(levels, LoggingLevel::ALL.to_vec());
        assert_eq!(s.get_buffer_size(), 7);
    }

    #[tokio::test]
    async fn test_rejected_entry_is_still_chainable() {
        let f = fixture(4);
        let builder = f.service.error("too severe for this user").await;
        builder.add_tag("ignored").set_record_id("001");
        assert_eq!(builder.snapshot().tags, vec!["ignored".to_string()]);
        assert_eq!(f.service.get_buffer_size(), 0);
    }

    #[tokio::test]
    async fn test_entries_carry_client_context_and_message() {
        let f = fixture(1);
        let entry = f.service.warn("hello").await.snapshot();
        assert_eq!(entry.message.as_deref(), Some("hello"));
        assert_eq!(entry.context.url.as_deref(), Some("app://test"));
    }

    #[tokio::test]
    async fn test_buffer_size_counts_only_accepted_calls() {
        let f = fixture(3);
        for _ in 0..3 {
            f.service.error("rejected").await;
            f.service.info("accepted").await;
        }
        assert_eq!(f.service.get_buffer_size(), 3);

        f.service.flush_buffer();
        assert_eq!(f.service.get_buffer_size(), 0);

        f.service.finest("accepted").await;
        assert_eq!(f.service.get_buffer_size(), 1);
    }

    #[tokio::test]
    async fn test_set_scenario_stamps_existing_and_new_entries() {
        let f = fixture(1);
        let first = f.service.info("one").await;
        let second = f.service.warn("two").await;

        f.service.set_scenario("checkout");
        let third = f.service.debug("three").await;

        for builder in [&first, &second, &third] {
            assert_eq!(builder.snapshot().scenario.as_deref(), Some("checkout"));
        }

        f.service.clear_scenario();
        assert!(f.service.info("four").await.snapshot().scenario.is_none());
        assert_eq!(first.snapshot().scenario.as_deref(), Some("checkout"));
    }

    #[tokio::test]
    async fn test_scenario_set_while_settings_load_applies() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)).with_gate(),
            RecordingSink::default(),
        );
        let (builder, ()) = tokio::join!(f.service.info("pending"), async {
            tokio::task::yield_now().await;
            f.service.set_scenario("late");
            f.provider.release();
        });
        assert_eq!(builder.snapshot().scenario.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_calls_while_loading_share_one_fetch() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)).with_gate(),
            RecordingSink::default(),
        );
        let (_, _, ()) = tokio::join!(f.service.info("a"), f.service.error("b"), async {
            tokio::task::yield_now().await;
            f.provider.release();
        });
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.service.get_buffer_size(), 2);

        f.service.info("c").await;
        assert!(f.service.get_user_settings().await.is_some());
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_settings_failure_rejects_entries() {
        let f = fixture_with(
            StubSettingsProvider::failing(SettingsError::Transport("offline".to_string())),
            RecordingSink::default(),
        );
        let builder = f.service.error("lost").await;
        builder.add_tag("still works");
        assert_eq!(f.service.get_buffer_size(), 0);
        assert!(f.service.get_user_settings().await.is_none());
        assert!(logs_contain("Failed to load logger settings"));
    }

    #[tokio::test]
    async fn test_flush_buffer_on_empty_buffer() {
        let f = fixture(1);
        f.service.flush_buffer();
        f.service.flush_buffer();
        assert_eq!(f.service.get_buffer_size(), 0);
        assert_eq!(f.service.save_log(None).await, SaveOutcome::Empty);
        assert_eq!(f.sink.calls(), 0);
        // Nothing needed settings yet.
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_log_sends_buffer_and_clears_it() {
        let f = fixture(1);
        f.service.info("one").await.add_tag("a");
        let second = f.service.error("two").await;
        // Changes made after creation are part of the batch.
        second.set_record_id("001");

        assert_eq!(f.service.save_log(None).await, SaveOutcome::Saved(2));
        assert_eq!(f.service.get_buffer_size(), 0);

        let requests = f.sink.requests();
        assert_eq!(requests.len(), 1);
        let entries = &requests[0].component_log_entries;
        assert_eq!(entries[0].message.as_deref(), Some("one"));
        assert_eq!(entries[0].tags, vec!["a".to_string()]);
        assert_eq!(entries[1].record_id.as_deref(), Some("001"));
        assert_eq!(requests[0].save_method_name, Some(SaveMethod::EVENT_BUS));

        assert_eq!(f.service.save_log(None).await, SaveOutcome::Empty);
        assert_eq!(f.sink.calls(), 1);
    }

    #[tokio::test]
    async fn test_save_log_explicit_method_wins() {
        let f = fixture(1);
        f.service.info("one").await;
        f.service.save_log(Some(SaveMethod::SYNCHRONOUS_DML)).await;
        assert_eq!(
            f.sink.requests()[0].save_method_name,
            Some(SaveMethod::SYNCHRONOUS_DML)
        );
    }

    #[tokio::test]
    async fn test_failed_save_is_reported_once_and_retained() {
        let f = console_fixture(RecordingSink::failing(SubmissionError::Destination {
            status: Some(503),
            message: "unavailable".to_string(),
        }));
        f.service.info("one").await;
        f.service.warn("two").await;
        // Wait for both entries to be mirrored (line + details each).
        wait_for(|| f.channel.len() == 4).await;

        assert_eq!(f.service.save_log(None).await, SaveOutcome::Failed(2));
        assert_eq!(f.service.get_buffer_size(), 2);

        let failures: Vec<_> = f
            .channel
            .records()
            .into_iter()
            .filter_map(|record| match record {
                DiagnosticRecord::SubmissionFailed { error, entries } => Some((error, entries)),
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 1);
        let (error, entries) = &failures[0];
        assert!(error.contains("unavailable"));
        let entries = entries.as_array().expect("entries snapshot is an array");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["message"], "one");
        assert_eq!(entries[1]["message"], "two");

        // A later save sends the retained entries.
        f.sink.succeed();
        assert_eq!(f.service.save_log(None).await, SaveOutcome::Saved(2));
        assert_eq!(f.sink.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_save_without_console_is_silent() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)),
            RecordingSink::failing(SubmissionError::Payload("bad".to_string())),
        );
        f.service.info("one").await;
        assert_eq!(f.service.save_log(None).await, SaveOutcome::Failed(1));
        assert!(f.channel.is_empty());
        assert_eq!(f.service.get_buffer_size(), 1);
    }

    #[tokio::test]
    async fn test_entries_created_during_save_wait_for_next_save() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)),
            RecordingSink::default().with_gate(),
        );
        f.service.info("in batch").await;

        let (outcome, ()) = tokio::join!(f.service.save_log(None), async {
            tokio::task::yield_now().await;
            f.service.info("after snapshot").await;
            assert_eq!(f.service.get_buffer_size(), 1);
            f.sink.release();
        });
        assert_eq!(outcome, SaveOutcome::Saved(1));
        assert_eq!(f.service.get_buffer_size(), 1);
        assert_eq!(
            f.sink.requests()[0].component_log_entries[0].message.as_deref(),
            Some("in batch")
        );
    }

    #[tokio::test]
    async fn test_failed_batch_goes_before_newer_entries() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)),
            RecordingSink::failing(SubmissionError::Destination {
                status: None,
                message: "timeout".to_string(),
            })
            .with_gate(),
        );
        f.service.info("old").await;

        let (outcome, ()) = tokio::join!(f.service.save_log(None), async {
            tokio::task::yield_now().await;
            f.service.info("new").await;
            f.sink.release();
        });
        assert_eq!(outcome, SaveOutcome::Failed(1));

        f.sink.succeed();
        f.service.save_log(None).await;
        let messages: Vec<_> = f.sink.requests()[1]
            .component_log_entries
            .iter()
            .map(|entry| entry.message.clone().unwrap_or_default())
            .collect();
        assert_eq!(messages, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn test_flush_during_failed_save_drops_batch() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)),
            RecordingSink::failing(SubmissionError::Payload("bad".to_string())).with_gate(),
        );
        f.service.info("old").await;

        let (outcome, ()) = tokio::join!(f.service.save_log(None), async {
            tokio::task::yield_now().await;
            f.service.flush_buffer();
            f.sink.release();
        });
        assert_eq!(outcome, SaveOutcome::Failed(1));
        assert_eq!(f.service.get_buffer_size(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_saves_never_send_twice() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)),
            RecordingSink::default().with_gate(),
        );
        f.service.info("only once").await;

        let (a, b, ()) = tokio::join!(f.service.save_log(None), f.service.save_log(None), async {
            tokio::task::yield_now().await;
            f.sink.release();
        });
        let mut outcomes = vec![a, b];
        outcomes.sort_by_key(|outcome| matches!(outcome, SaveOutcome::Saved(_)));
        assert_eq!(outcomes, vec![SaveOutcome::Empty, SaveOutcome::Saved(1)]);
        assert_eq!(f.sink.calls(), 1);
    }

    #[tokio::test]
    async fn test_console_mirroring_routes_by_level() {
        let f = console_fixture(RecordingSink::default());
        f.service.finer("quiet").await;
        wait_for(|| f.channel.len() == 2).await;
        assert_eq!(
            f.channel.records()[0],
            DiagnosticRecord::Line {
                stream: crate::console::ConsoleStream::Debug,
                message: "quiet".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_call_during_outage_fetches_once() {
        let f = fixture_with(
            StubSettingsProvider::failing(SettingsError::Transport("offline".to_string())),
            RecordingSink::default(),
        );
        f.service.error("lost").await;
        // Give the mirroring task time to run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mirrored_details_carry_the_call_stack() {
        let f = console_fixture(RecordingSink::default());
        let builder = f.service.info("x").await;
        wait_for(|| f.channel.len() == 2).await;

        assert!(builder.snapshot().stack.is_some());
        match &f.channel.records()[1] {
            DiagnosticRecord::Details { stack, .. } => assert!(stack.is_some()),
            other => panic!("expected details, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scenario_set_during_failed_save_reaches_retained_batch() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)),
            RecordingSink::failing(SubmissionError::Destination {
                status: Some(503),
                message: "unavailable".to_string(),
            })
            .with_gate(),
        );
        f.service.info("old").await;

        let (outcome, ()) = tokio::join!(f.service.save_log(None), async {
            tokio::task::yield_now().await;
            f.service.set_scenario("S");
            f.service.info("new").await;
            f.sink.release();
        });
        assert_eq!(outcome, SaveOutcome::Failed(1));

        f.sink.succeed();
        assert_eq!(f.service.save_log(None).await, SaveOutcome::Saved(2));
        let resent: Vec<_> = f.sink.requests()[1]
            .component_log_entries
            .iter()
            .map(|entry| (entry.message.clone(), entry.scenario.clone()))
            .collect();
        assert_eq!(
            resent,
            vec![
                (Some("old".to_string()), Some("S".to_string())),
                (Some("new".to_string()), Some("S".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_its_scenario_when_unchanged() {
        let f = fixture_with(
            StubSettingsProvider::ok(settings_with(1, LEVELS)),
            RecordingSink::failing(SubmissionError::Payload("bad".to_string())),
        );
        f.service.set_scenario("import");
        let entry = f.service.info("row 1").await;
        f.service.clear_scenario();

        assert_eq!(f.service.save_log(None).await, SaveOutcome::Failed(1));
        assert_eq!(entry.snapshot().scenario.as_deref(), Some("import"));
    }

    #[derive(Default)]
    struct ReentrantChannel {
        service: Mutex<Option<LoggerService>>,
        buffer_sizes: Mutex<Vec<usize>>,
    }

    impl DiagnosticChannel for ReentrantChannel {
        fn emit(&self, _record: DiagnosticRecord) {
            let service = self.service.lock().unwrap().clone();
            if let Some(service) = service {
                let size = service.get_buffer_size();
                self.buffer_sizes.lock().unwrap().push(size);
            }
        }
    }

    #[test]
    fn test_channel_may_call_back_into_service() {
        let mut settings = settings_with(1, LEVELS);
        settings.is_console_logging_enabled = true;
        let channel = Arc::new(ReentrantChannel::default());
        let service = LoggerService::new(
            Arc::new(StubSettingsProvider::ok(settings)),
            Arc::new(RecordingSink::default()),
        )
        .with_diagnostic_channel(channel.clone());
        *channel.service.lock().unwrap() = Some(service.clone());

        // Outside a tokio runtime the mirror emits synchronously.
        futures::executor::block_on(async {
            assert!(service.get_user_settings().await.is_some());
            service.info("echoed").await;
        });
        assert_eq!(*channel.buffer_sizes.lock().unwrap(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_clones_share_buffer() {
        let f = fixture(1);
        let other = f.service.clone();
        other.info("from clone").await;
        assert_eq!(f.service.get_buffer_size(), 1);
    }
}
