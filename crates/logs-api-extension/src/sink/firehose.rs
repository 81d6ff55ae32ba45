// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_firehose::error::DisplayErrorContext;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::Record;
use aws_sdk_firehose::Client;
use tracing::debug;

use crate::error::SinkError;
use crate::lambda::{InvokeContext, LogRecord};
use crate::sink::{LogSink, OutboundLogEntry};

/// Writes each record to a Kinesis Data Firehose delivery stream with one `PutRecord` call.
pub struct FirehoseSink {
    client: Client,
    stream_name: String,
}

impl FirehoseSink {
    pub fn new(client: Client, stream_name: impl Into<String>) -> Self {
        FirehoseSink {
            client,
            stream_name: stream_name.into(),
        }
    }

    /// Builds the client from the default AWS credential and region chain of the function's
    /// execution role.
    pub async fn from_env(stream_name: impl Into<String>) -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), stream_name)
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

#[async_trait]
impl LogSink for FirehoseSink {
    async fn forward(&self, context: &InvokeContext, record: &LogRecord) -> Result<(), SinkError> {
        let data = OutboundLogEntry::new(context, record).to_json()?;
        let record = Record::builder()
            .data(Blob::new(data))
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let output = self
            .client
            .put_record()
            .delivery_stream_name(&self.stream_name)
            .record(record)
            .send()
            .await
            .map_err(|e| SinkError::Transport(DisplayErrorContext(e).to_string()))?;

        debug!(
            "Wrote record {} to {}",
            output.record_id(),
            self.stream_name
        );
        Ok(())
    }
}
