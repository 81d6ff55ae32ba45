// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Drives the extension through the Lambda lifecycle.
//!
//! ```text
//!   Initializing ──> Polling ──(INVOKE)──> Draining
//!                     ^   │                   │
//!                     │   └──(SHUTDOWN)──> ShuttingDown ──> Terminated
//!                     └───────────────────────┘
//! ```
//!
//! Batches are only forwarded after `event/next` returns, so logs written during one invoke
//! usually go out during the next invoke's drain, or during the final drain on shutdown.
//! Records are paired with the most recently fetched invoke, not the invoke that produced
//! them: a record emitted at the very end of invoke N and drained after invoke N+1 started is
//! attributed to N+1.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{ExtensionError, SinkError};
use crate::extension_api::{ErrorPhase, ExtensionApi};
use crate::lambda::{
    AgentIdentity, Destination, InvokeContext, LogRecord, RegistrationRequest, SubscriptionRequest,
    WorkSlice,
};
use crate::listener::LogsListener;
use crate::logs_api::LogsApi;
use crate::queue::HandoffQueue;
use crate::sink::{LogSink, SinkErrorPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Initializing,
    Polling,
    Draining,
    ShuttingDown,
    Terminated,
}

/// Everything the coordinator talks to, built once at startup.
#[derive(Clone)]
pub struct ExtensionContext {
    pub agent_name: String,
    pub config: Arc<Config>,
    pub extension_api: Arc<dyn ExtensionApi + Send + Sync>,
    pub logs_api: Arc<dyn LogsApi + Send + Sync>,
    pub sink: Arc<dyn LogSink + Send + Sync>,
}

pub struct Coordinator {
    context: ExtensionContext,
    queue: Arc<HandoffQueue>,
    state: CoordinatorState,
    agent_id: Option<AgentIdentity>,
    current_invoke: Option<InvokeContext>,
    listener_handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl Coordinator {
    pub fn new(context: ExtensionContext) -> Self {
        let queue = match context.config.max_queued_batches {
            Some(capacity) => HandoffQueue::bounded(capacity),
            None => HandoffQueue::new(),
        };
        Self::with_queue(context, Arc::new(queue))
    }

    pub fn with_queue(context: ExtensionContext, queue: Arc<HandoffQueue>) -> Self {
        Coordinator {
            context,
            queue,
            state: CoordinatorState::Initializing,
            agent_id: None,
            current_invoke: None,
            listener_handle: None,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn queue(&self) -> Arc<HandoffQueue> {
        Arc::clone(&self.queue)
    }

    /// Runs until the platform sends SHUTDOWN or a fatal error occurs. A fatal error is
    /// reported to the platform before being returned.
    pub async fn run(&mut self) -> Result<(), ExtensionError> {
        let result = self.run_lifecycle().await;
        if let Some(handle) = self.listener_handle.take() {
            handle.abort();
        }
        if let Err(e) = &result {
            error!("Extension failed in state {:?}: {e}", self.state);
            if let Some(agent_id) = &self.agent_id {
                let phase = if self.state == CoordinatorState::Initializing {
                    ErrorPhase::Init
                } else {
                    ErrorPhase::Exit
                };
                self.context
                    .extension_api
                    .report_error(agent_id, phase, e)
                    .await;
            }
        }
        self.state = CoordinatorState::Terminated;
        result
    }

    async fn run_lifecycle(&mut self) -> Result<(), ExtensionError> {
        let agent_id = self.initialize().await?;

        loop {
            self.state = CoordinatorState::Polling;
            match self.next_slice(&agent_id).await? {
                WorkSlice::Invoke(invoke) => {
                    debug!("Received INVOKE for request {}", invoke.request_id);
                    self.current_invoke = Some(invoke);
                    self.state = CoordinatorState::Draining;
                    self.drain().await?;
                }
                WorkSlice::Shutdown(shutdown) => {
                    info!(
                        "Received SHUTDOWN ({}), deadline {} ms",
                        shutdown.shutdown_reason, shutdown.deadline_ms
                    );
                    self.state = CoordinatorState::ShuttingDown;
                    self.drain().await?;
                    return Ok(());
                }
            }
        }
    }

    /// Registers, starts the listener, then subscribes, strictly in that order: a push can
    /// only arrive once subscribed, and it must find the listener already accepting.
    async fn initialize(&mut self) -> Result<AgentIdentity, ExtensionError> {
        self.state = CoordinatorState::Initializing;
        let ExtensionContext {
            agent_name,
            config,
            extension_api,
            logs_api,
            ..
        } = &self.context;

        info!("Initializing extension {agent_name}");
        let agent_id = extension_api
            .register(agent_name, &RegistrationRequest::default())
            .await?;
        self.agent_id = Some(agent_id.clone());

        let listener = LogsListener::bind(
            &config.receiver_bind_address,
            config.receiver_port,
            Arc::clone(&self.queue),
            config.max_request_content_length,
        )
        .await
        .map_err(|e| {
            ExtensionError::Listener(format!(
                "unable to bind {}:{}: {e}",
                config.receiver_bind_address, config.receiver_port
            ))
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| ExtensionError::Listener(e.to_string()))?
            .port();
        self.listener_handle = Some(listener.spawn());

        let subscription = SubscriptionRequest {
            destination: Destination {
                protocol: "HTTP".to_string(),
                uri: config.receiver_uri(port),
            },
            types: config.log_types.clone(),
            buffering: config.buffering,
        };
        logs_api.subscribe(&agent_id, &subscription).await?;

        info!(
            "Extension {agent_name} subscribed, receiving logs on {}",
            subscription.destination.uri
        );
        Ok(agent_id)
    }

    /// Waits for the next event while making sure the listener is still alive.
    async fn next_slice(&mut self, agent_id: &AgentIdentity) -> Result<WorkSlice, ExtensionError> {
        let extension_api = Arc::clone(&self.context.extension_api);
        let Some(listener_handle) = self.listener_handle.as_mut() else {
            return extension_api.next_slice(agent_id).await;
        };
        let result = tokio::select! {
            slice = extension_api.next_slice(agent_id) => return slice,
            result = listener_handle => result,
        };
        self.listener_handle = None;
        Err(ExtensionError::Listener(format!(
            "listener task terminated: {result:?}"
        )))
    }

    /// Forwards every batch queued so far, oldest first, record by record.
    async fn drain(&mut self) -> Result<(), ExtensionError> {
        let batches = self.queue.try_pop_all();
        if batches.is_empty() {
            return Ok(());
        }

        let context = match &self.current_invoke {
            Some(invoke) => invoke.clone(),
            None => {
                warn!("Forwarding logs received before any invoke without invoke context");
                InvokeContext::default()
            }
        };

        let mut forwarded = 0usize;
        let mut skipped = 0usize;
        for batch in &batches {
            for record in batch {
                if self.forward(&context, record).await? {
                    forwarded += 1;
                } else {
                    skipped += 1;
                }
            }
        }
        debug!(
            "Drained {} batches for request {}: {forwarded} records forwarded, {skipped} skipped",
            batches.len(),
            context.request_id
        );
        Ok(())
    }

    /// Applies the sink error policy. `Ok(false)` means the record was skipped.
    async fn forward(
        &self,
        context: &InvokeContext,
        record: &LogRecord,
    ) -> Result<bool, ExtensionError> {
        let sink = &self.context.sink;
        let mut attempts: u32 = 0;
        loop {
            let err: SinkError = match sink.forward(context, record).await {
                Ok(()) => return Ok(true),
                Err(e) => e,
            };
            attempts += 1;

            match self.context.config.sink_error_policy {
                SinkErrorPolicy::Fatal => return Err(err.into()),
                SinkErrorPolicy::SkipAndLog => {
                    error!("Skipping log record: {err}");
                    return Ok(false);
                }
                SinkErrorPolicy::Retry { times, backoff_ms } => {
                    if attempts > times {
                        error!("Giving up on log record after {attempts} attempts: {err}");
                        return Err(err.into());
                    }
                    let backoff = backoff_ms.saturating_mul(2_u64.saturating_pow(attempts - 1));
                    warn!("Retrying log record in {backoff} ms (attempt {attempts}): {err}");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
        }
    }
}
