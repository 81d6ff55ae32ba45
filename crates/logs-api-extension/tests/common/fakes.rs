// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory stand-ins for the coordinator's collaborators

use async_trait::async_trait;
use logs_api_extension::{
    config::Config,
    error::{ExtensionError, SinkError},
    extension_api::{ErrorPhase, ExtensionApi},
    lambda::{
        AgentIdentity, Buffering, InvokeContext, LogBatch, LogRecord, LogType,
        RegistrationRequest, ShutdownSignal, SubscriptionRequest, WorkSlice,
    },
    logs_api::LogsApi,
    queue::HandoffQueue,
    sink::{LogSink, OutboundLogEntry, SinkErrorPolicy},
};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use super::helpers::{push_body, send_tcp_request};

/// Ordered record of every collaborator call, shared by all fakes of one test
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == call).count()
    }
}

pub fn invoke(arn: &str, request_id: &str) -> WorkSlice {
    WorkSlice::Invoke(InvokeContext {
        invoked_function_arn: arn.to_string(),
        request_id: request_id.to_string(),
        deadline_ms: 0,
    })
}

pub fn shutdown() -> WorkSlice {
    WorkSlice::Shutdown(ShutdownSignal {
        shutdown_reason: "spindown".to_string(),
        deadline_ms: 2000,
    })
}

/// One scripted `event/next` response. `pushes` land on the queue right before the event
/// is returned, as if the platform had pushed them while the extension was waiting.
pub struct Step {
    pub pushes: Vec<LogBatch>,
    pub slice: WorkSlice,
}

impl Step {
    pub fn new(slice: WorkSlice) -> Self {
        Step {
            pushes: Vec::new(),
            slice,
        }
    }

    pub fn with_push(mut self, batch: LogBatch) -> Self {
        self.pushes.push(batch);
        self
    }
}

pub struct ScriptedExtensionApi {
    pub calls: CallLog,
    pub queue: Arc<HandoffQueue>,
    pub steps: Mutex<VecDeque<Step>>,
    pub fail_registration: bool,
    pub reported_errors: Mutex<Vec<(ErrorPhase, String)>>,
}

impl ScriptedExtensionApi {
    pub fn new(calls: CallLog, queue: Arc<HandoffQueue>, steps: Vec<Step>) -> Self {
        ScriptedExtensionApi {
            calls,
            queue,
            steps: Mutex::new(steps.into()),
            fail_registration: false,
            reported_errors: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ExtensionApi for ScriptedExtensionApi {
    async fn register(
        &self,
        _agent_name: &str,
        _request: &RegistrationRequest,
    ) -> Result<AgentIdentity, ExtensionError> {
        self.calls.push("register");
        if self.fail_registration {
            return Err(ExtensionError::Registration("status 500".to_string()));
        }
        Ok(AgentIdentity::new("test-agent-id"))
    }

    async fn next_slice(&self, agent_id: &AgentIdentity) -> Result<WorkSlice, ExtensionError> {
        assert_eq!(agent_id.as_str(), "test-agent-id");
        self.calls.push("next");
        let step = self.steps.lock().unwrap().pop_front();
        let Some(step) = step else {
            return Err(ExtensionError::Lifecycle("no event scripted".to_string()));
        };
        for batch in step.pushes {
            self.queue.push(batch).unwrap();
        }
        Ok(step.slice)
    }

    async fn report_error(
        &self,
        _agent_id: &AgentIdentity,
        phase: ErrorPhase,
        error: &ExtensionError,
    ) {
        self.calls.push("report_error");
        self.reported_errors
            .lock()
            .unwrap()
            .push((phase, error.to_string()));
    }
}

pub struct RecordingLogsApi {
    pub calls: CallLog,
    pub subscriptions: Mutex<Vec<SubscriptionRequest>>,
    pub fail: bool,
    /// Records pushed to the subscribed destination from inside `subscribe`
    pub push_on_subscribe: Option<Vec<&'static str>>,
    pub push_statuses: Mutex<Vec<u16>>,
}

impl RecordingLogsApi {
    pub fn new(calls: CallLog) -> Self {
        RecordingLogsApi {
            calls,
            subscriptions: Mutex::new(Vec::new()),
            fail: false,
            push_on_subscribe: None,
            push_statuses: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LogsApi for RecordingLogsApi {
    async fn subscribe(
        &self,
        _agent_id: &AgentIdentity,
        request: &SubscriptionRequest,
    ) -> Result<(), ExtensionError> {
        self.calls.push("subscribe");
        self.subscriptions.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(ExtensionError::Subscription("status 400".to_string()));
        }
        if let Some(records) = &self.push_on_subscribe {
            let addr: SocketAddr = request
                .destination
                .uri
                .trim_start_matches("http://")
                .parse()
                .unwrap();
            let response = send_tcp_request(addr, "POST", Some(push_body(records)))
                .await
                .unwrap();
            self.push_statuses
                .lock()
                .unwrap()
                .push(response.status().as_u16());
        }
        Ok(())
    }
}

/// Sink keeping the serialized entries it was asked to write
pub struct RecordingSink {
    pub calls: CallLog,
    pub entries: Mutex<Vec<String>>,
    /// Number of upcoming `forward` calls that fail
    pub fail_next: Mutex<u32>,
    /// Records that always fail
    pub poison: Vec<serde_json::Value>,
    pub attempts: Mutex<u32>,
}

impl RecordingSink {
    pub fn new(calls: CallLog) -> Self {
        RecordingSink {
            calls,
            entries: Mutex::new(Vec::new()),
            fail_next: Mutex::new(0),
            poison: Vec::new(),
            attempts: Mutex::new(0),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn forward(&self, context: &InvokeContext, record: &LogRecord) -> Result<(), SinkError> {
        *self.attempts.lock().unwrap() += 1;
        {
            let mut fail_next = self.fail_next.lock().unwrap();
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(SinkError::Transport("ServiceUnavailableException".to_string()));
            }
        }
        if self.poison.contains(&record.record) {
            return Err(SinkError::Transport("record rejected".to_string()));
        }
        let entry = OutboundLogEntry::new(context, record).to_json()?;
        self.calls.push("forward");
        self.entries
            .lock()
            .unwrap()
            .push(String::from_utf8(entry).unwrap());
        Ok(())
    }
}

/// Config with the listener on an ephemeral localhost port
pub fn test_config(sink_error_policy: SinkErrorPolicy) -> Config {
    Config {
        runtime_api: "127.0.0.1:9001".to_string(),
        firehose_stream_name: "test-stream".to_string(),
        receiver_host: "127.0.0.1".to_string(),
        receiver_bind_address: "127.0.0.1".to_string(),
        receiver_port: 0,
        log_types: vec![LogType::Function],
        buffering: Buffering {
            timeout_ms: 1000,
            max_bytes: 262_144,
            max_items: 10_000,
        },
        max_request_content_length: 10 * 1024 * 1024,
        max_queued_batches: None,
        sink_error_policy,
    }
}
