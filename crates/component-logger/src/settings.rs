// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logger settings and the lazily-loaded cache that serves them.
//!
//! Settings are fetched on first need and then held for the lifetime of the
//! cache. While a fetch is in flight every caller attaches to the same shared
//! future, so a burst of log calls at startup produces a single request.

use crate::error::SettingsError;
use crate::level::LoggingLevel;
use crate::sink::SaveMethod;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// The logging level configured for the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoggingLevel {
    pub name: String,
    pub ordinal: i32,
}

/// Settings returned by the logger settings endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentLoggerSettings {
    pub is_enabled: bool,
    #[serde(default)]
    pub is_console_logging_enabled: bool,
    #[serde(default)]
    pub default_save_method_name: Option<SaveMethod>,
    /// Ordinal of every level the backend knows about, keyed by level name.
    pub supported_logging_levels: HashMap<String, i32>,
    pub user_logging_level: UserLoggingLevel,
}

impl ComponentLoggerSettings {
    pub fn level_ordinal(&self, level: LoggingLevel) -> Option<i32> {
        self.supported_logging_levels.get(level.as_str()).copied()
    }

    /// Entries are kept when logging is enabled and the level's ordinal is at
    /// or above the user's ordinal. Levels missing from the map are dropped.
    pub fn meets_user_logging_level(&self, level: LoggingLevel) -> bool {
        self.is_enabled
            && self
                .level_ordinal(level)
                .map_or(false, |ordinal| ordinal >= self.user_logging_level.ordinal)
    }
}

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn fetch_settings(&self) -> Result<ComponentLoggerSettings, SettingsError>;
}

type SettingsFuture = Shared<BoxFuture<'static, Result<Arc<ComponentLoggerSettings>, SettingsError>>>;

enum CacheState {
    Uninitialized,
    Loading(SettingsFuture),
    Ready(Arc<ComponentLoggerSettings>),
}

/// Observable phase of a [`SettingsCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePhase {
    Uninitialized,
    Loading,
    Ready,
}

#[derive(Clone)]
pub struct SettingsCache {
    provider: Arc<dyn SettingsProvider>,
    state: Arc<Mutex<CacheState>>,
}

impl SettingsCache {
    pub fn new(provider: Arc<dyn SettingsProvider>) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(CacheState::Uninitialized)),
        }
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().expect("lock poisoned")
    }

    pub fn phase(&self) -> CachePhase {
        match &*self.lock() {
            CacheState::Uninitialized => CachePhase::Uninitialized,
            CacheState::Loading(_) => CachePhase::Loading,
            CacheState::Ready(_) => CachePhase::Ready,
        }
    }

    /// Returns the settings if they have already been loaded, without fetching.
    pub fn cached(&self) -> Option<Arc<ComponentLoggerSettings>> {
        match &*self.lock() {
            CacheState::Ready(settings) => Some(Arc::clone(settings)),
            _ => None,
        }
    }

    /// Returns the cached settings, fetching them first if needed.
    ///
    /// A failed fetch is reported to every caller that was waiting on it and
    /// leaves the cache uninitialized, so the next call starts a new fetch.
    pub async fn get(&self) -> Result<Arc<ComponentLoggerSettings>, SettingsError> {
        let fetch = {
            let mut state = self.lock();
            match &*state {
                CacheState::Ready(settings) => return Ok(Arc::clone(settings)),
                CacheState::Loading(fetch) => fetch.clone(),
                CacheState::Uninitialized => {
                    debug!("Loading logger settings");
                    let provider = Arc::clone(&self.provider);
                    let fetch = async move { provider.fetch_settings().await.map(Arc::new) }
                        .boxed()
                        .shared();
                    *state = CacheState::Loading(fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.clone().await;
        self.complete(&fetch, &result);
        result
    }

    /// Returns settings that are loaded or being loaded, without ever
    /// starting a fetch. A fetch in flight is joined; an uninitialized cache
    /// yields `None`.
    pub async fn current(&self) -> Option<Arc<ComponentLoggerSettings>> {
        let fetch = {
            let state = self.lock();
            match &*state {
                CacheState::Ready(settings) => return Some(Arc::clone(settings)),
                CacheState::Loading(fetch) => fetch.clone(),
                CacheState::Uninitialized => return None,
            }
        };

        let result = fetch.clone().await;
        self.complete(&fetch, &result);
        result.ok()
    }

    fn complete(
        &self,
        fetch: &SettingsFuture,
        result: &Result<Arc<ComponentLoggerSettings>, SettingsError>,
    ) {
        let mut state = self.lock();
        // Only the first waiter to come back moves the state machine forward.
        if let CacheState::Loading(current) = &*state {
            if current.ptr_eq(fetch) {
                *state = match result {
                    Ok(settings) => {
                        debug!("Loaded logger settings");
                        CacheState::Ready(Arc::clone(settings))
                    }
                    Err(err) => {
                        error!("Failed to load logger settings: {err}");
                        CacheState::Uninitialized
                    }
                };
            }
        }
    }
}

impl Debug for SettingsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettingsCache({:?})", self.phase())
    }
}
