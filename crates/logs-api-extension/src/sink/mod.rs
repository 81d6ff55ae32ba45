// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Downstream delivery of log records.
//!
//! Every record is paired with an [`InvokeContext`] to build an [`OutboundLogEntry`], which a
//! [`LogSink`] writes with one call per record. The coordinator decides what a failed write
//! means through [`SinkErrorPolicy`].

pub mod firehose;

use async_trait::async_trait;
use serde::Serialize;
use std::str::FromStr;

use crate::error::SinkError;
use crate::lambda::{InvokeContext, LogRecord};

/// Shape of a record as written to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundLogEntry<'a> {
    /// ARN of the invoked function
    pub source: &'a str,
    /// Request id of the invoke
    pub execution: &'a str,
    pub log: &'a serde_json::Value,
}

impl<'a> OutboundLogEntry<'a> {
    pub fn new(context: &'a InvokeContext, record: &'a LogRecord) -> Self {
        OutboundLogEntry {
            source: &context.invoked_function_arn,
            execution: &context.request_id,
            log: &record.record,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SinkError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[async_trait]
pub trait LogSink {
    /// Writes a single record. Returns once the sink acknowledged the write.
    async fn forward(&self, context: &InvokeContext, record: &LogRecord) -> Result<(), SinkError>;
}

/// What the coordinator does when [`LogSink::forward`] fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SinkErrorPolicy {
    /// Stop the extension.
    #[default]
    Fatal,
    /// Log the failure, drop the record and carry on.
    SkipAndLog,
    /// Retry up to `times` more times with exponential backoff starting at `backoff_ms`,
    /// then stop the extension.
    Retry { times: u32, backoff_ms: u64 },
}

impl FromStr for SinkErrorPolicy {
    type Err = String;

    /// Accepts `fatal`, `skip-and-log` and `retry(<times>,<backoff_ms>)`. `retry-n(...)` is
    /// an accepted alias of `retry(...)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "fatal" => return Ok(SinkErrorPolicy::Fatal),
            "skip-and-log" => return Ok(SinkErrorPolicy::SkipAndLog),
            _ => {}
        }

        let args = s
            .strip_prefix("retry-n(")
            .or_else(|| s.strip_prefix("retry("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| {
                format!("expected fatal, skip-and-log or retry(<times>,<backoff_ms>), got '{s}'")
            })?;

        let (times, backoff) = args
            .split_once(',')
            .ok_or_else(|| format!("retry needs two arguments, got '{args}'"))?;
        let times = times
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid retry count '{}': {e}", times.trim()))?;
        let backoff = backoff.trim();
        let backoff_ms = backoff
            .strip_suffix("ms")
            .unwrap_or(backoff)
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("invalid retry backoff '{backoff}': {e}"))?;

        Ok(SinkErrorPolicy::Retry { times, backoff_ms })
    }
}
