// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, path::Path, process::ExitCode, sync::Arc};
use tracing::{debug, error, info};

use logs_api_extension::{
    config::Config,
    coordinator::{Coordinator, ExtensionContext},
    extension_api::ExtensionApiClient,
    logger,
    logs_api::LogsApiClient,
    sink::firehose::FirehoseSink,
};

const DEFAULT_AGENT_NAME: &str = "logs-api-extension";

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("LOGS_EXTENSION_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    if let Err(e) = logger::init(&log_level) {
        eprintln!("{} | ERROR | Unable to set up logging: {e}", logger::LOG_PREFIX);
        return ExitCode::FAILURE;
    }
    debug!("Logging subsystem enabled");

    // External extensions must register under their own file name.
    let agent_name = env::args()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string());

    let config = match Config::new() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Error creating config on extension startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    let extension_api = match ExtensionApiClient::new(&config.runtime_api) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let logs_api = match LogsApiClient::new(&config.runtime_api) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let sink = Arc::new(FirehoseSink::from_env(config.firehose_stream_name.clone()).await);
    info!(
        "Starting extension {agent_name}, forwarding logs to Firehose stream {}",
        sink.stream_name()
    );

    let mut coordinator = Coordinator::new(ExtensionContext {
        agent_name,
        config,
        extension_api,
        logs_api,
        sink,
    });

    match coordinator.run().await {
        Ok(()) => {
            info!("Extension shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Extension terminated: {e}");
            ExitCode::FAILURE
        }
    }
}
