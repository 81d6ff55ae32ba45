// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;

use crate::lambda::{Buffering, LogType};
use crate::sink::SinkErrorPolicy;

pub const DEFAULT_FIREHOSE_STREAM_NAME: &str = "demo-firehose-lambda";
pub const RECEIVER_PORT: u16 = 4243;
const RECEIVER_HOST: &str = "sandbox";
const RECEIVER_BIND_ADDRESS: &str = "0.0.0.0";

/// Maximum time in milliseconds a batch is buffered by the platform.
pub const BUFFERING_TIMEOUT_MS: u64 = 1000;
/// Maximum size in bytes of the logs buffered by the platform.
pub const BUFFERING_MAX_BYTES: u64 = 262_144;
/// Maximum number of events buffered by the platform.
pub const BUFFERING_MAX_ITEMS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// `host:port` of the Lambda runtime API
    pub runtime_api: String,
    pub firehose_stream_name: String,
    /// Host name the platform uses to reach the listener
    pub receiver_host: String,
    pub receiver_bind_address: String,
    pub receiver_port: u16,
    pub log_types: Vec<LogType>,
    pub buffering: Buffering,
    pub max_request_content_length: usize,
    /// `None` keeps the handoff queue unbounded
    pub max_queued_batches: Option<usize>,
    pub sink_error_policy: SinkErrorPolicy,
}

impl Config {
    pub fn new() -> Result<Config, Box<dyn std::error::Error>> {
        let runtime_api = env::var("AWS_LAMBDA_RUNTIME_API").map_err(|_| {
            anyhow::anyhow!("AWS_LAMBDA_RUNTIME_API environment variable is not set")
        })?;

        // Change FIREHOSE_STREAM_NAME to deliver to another stream
        let firehose_stream_name = env::var("FIREHOSE_STREAM_NAME")
            .unwrap_or_else(|_| DEFAULT_FIREHOSE_STREAM_NAME.to_string());

        let sink_error_policy = match env::var("LOGS_EXTENSION_SINK_ERROR_POLICY") {
            Ok(val) => val.parse::<SinkErrorPolicy>().map_err(|e| {
                anyhow::anyhow!("Invalid LOGS_EXTENSION_SINK_ERROR_POLICY: {e}")
            })?,
            Err(_) => SinkErrorPolicy::default(),
        };

        let log_types = match env::var("LOGS_EXTENSION_LOG_TYPES") {
            Ok(val) => parse_log_types(&val)
                .map_err(|e| anyhow::anyhow!("Invalid LOGS_EXTENSION_LOG_TYPES: {e}"))?,
            Err(_) => vec![LogType::Function],
        };

        let max_queued_batches = match env::var("LOGS_EXTENSION_MAX_QUEUED_BATCHES") {
            Ok(val) => match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid LOGS_EXTENSION_MAX_QUEUED_BATCHES: expected a positive integer, got '{val}'"
                    )
                    .into())
                }
            },
            Err(_) => None,
        };

        Ok(Config {
            runtime_api,
            firehose_stream_name,
            receiver_host: RECEIVER_HOST.to_string(),
            receiver_bind_address: RECEIVER_BIND_ADDRESS.to_string(),
            receiver_port: RECEIVER_PORT,
            log_types,
            buffering: Buffering {
                timeout_ms: BUFFERING_TIMEOUT_MS,
                max_bytes: BUFFERING_MAX_BYTES,
                max_items: BUFFERING_MAX_ITEMS,
            },
            max_request_content_length: 10 * 1024 * 1024, // 10MB in Bytes
            max_queued_batches,
            sink_error_policy,
        })
    }

    /// URI the Logs API pushes to, for a listener bound on `port`.
    pub fn receiver_uri(&self, port: u16) -> String {
        format!("http://{}:{}", self.receiver_host, port)
    }
}

fn parse_log_types(val: &str) -> Result<Vec<LogType>, String> {
    let mut types = Vec::new();
    for t in val.split(',').filter(|t| !t.trim().is_empty()) {
        let log_type = t.parse::<LogType>()?;
        if !types.contains(&log_type) {
            types.push(log_type);
        }
    }
    if types.is_empty() {
        return Err("no log types given".to_string());
    }
    Ok(types)
}
