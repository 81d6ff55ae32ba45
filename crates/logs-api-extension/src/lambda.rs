// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire types exchanged with the Lambda Extensions API and Logs API.

use serde::{Deserialize, Serialize};

/// Identifier handed out by the Extensions API on registration. Every later lifecycle call
/// carries it in the `Lambda-Extension-Identifier` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity(String);

impl AgentIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        AgentIdentity(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Invoke,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRequest {
    pub events: Vec<EventKind>,
}

impl Default for RegistrationRequest {
    fn default() -> Self {
        RegistrationRequest {
            events: vec![EventKind::Invoke, EventKind::Shutdown],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeContext {
    pub invoked_function_arn: String,
    pub request_id: String,
    #[serde(default)]
    pub deadline_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownSignal {
    pub shutdown_reason: String,
    #[serde(default)]
    pub deadline_ms: u64,
}

/// Result of one `event/next` poll.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "eventType", rename_all = "UPPERCASE")]
pub enum WorkSlice {
    Invoke(InvokeContext),
    Shutdown(ShutdownSignal),
}

/// Log categories the Logs API can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Platform,
    Function,
    Extension,
}

impl std::str::FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "platform" => Ok(LogType::Platform),
            "function" => Ok(LogType::Function),
            "extension" => Ok(LogType::Extension),
            other => Err(format!("unknown log type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub protocol: String,
    #[serde(rename = "URI")]
    pub uri: String,
}

/// Whichever threshold is hit first triggers a push from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffering {
    pub timeout_ms: u64,
    pub max_bytes: u64,
    pub max_items: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest {
    pub destination: Destination,
    pub types: Vec<LogType>,
    pub buffering: Buffering,
}

/// One pushed record. `record` is kept as raw JSON; its shape depends on `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub time: Option<String>,
    pub record: serde_json::Value,
}

/// Records of a single push, in the order the platform sent them.
pub type LogBatch = Vec<LogRecord>;
