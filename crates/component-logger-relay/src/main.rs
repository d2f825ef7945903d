// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod relay;

use std::env;
use tokio::io::BufReader;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use component_logger::{LoggerConfig, LoggerService, SaveOutcome};

use crate::relay::Relay;

#[tokio::main]
pub async fn main() {
    let log_level = env::var("COMPONENT_LOGGER_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    // stdout carries command responses, so diagnostics go to stderr.
    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);
    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match LoggerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid logger configuration: {e}. Shutting down relay.");
            return;
        }
    };

    let logger = match LoggerService::from_config(&config) {
        Ok(logger) => logger,
        Err(e) => {
            error!("Failed to create logger: {e}. Shutting down relay.");
            return;
        }
    };

    info!("Relaying log requests from stdin");
    let relay = Relay::new(logger, config.save_method.clone());
    let outcome = relay
        .run(BufReader::new(tokio::io::stdin()), std::io::stdout())
        .await;

    if let SaveOutcome::Failed(count) = outcome {
        error!("{count} entries were not delivered");
        std::process::exit(1);
    }
}
