// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Fatal errors. Any of these terminates the extension with a non-zero status.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("Failed to register extension: {0}")]
    Registration(String),

    #[error("Failed to subscribe to the Logs API: {0}")]
    Subscription(String),

    #[error("Failed to fetch next event: {0}")]
    Lifecycle(String),

    #[error("Logs listener failed: {0}")]
    Listener(String),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl ExtensionError {
    /// Value for the `Lambda-Extension-Function-Error-Type` header when reporting this error
    /// to the platform.
    pub fn error_type(&self) -> &'static str {
        match self {
            ExtensionError::Registration(_) => "Extension.RegistrationError",
            ExtensionError::Subscription(_) => "Extension.SubscriptionError",
            ExtensionError::Lifecycle(_) => "Extension.LifecycleError",
            ExtensionError::Listener(_) => "Extension.ListenerError",
            ExtensionError::Sink(_) => "Extension.SinkError",
        }
    }
}

/// A pushed body that is not a JSON array of log records. Handled by rejecting the push.
#[derive(Debug, thiserror::Error)]
#[error("Malformed log batch: {0}")]
pub struct IngestionParseError(#[from] pub serde_json::Error);

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to serialize log entry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write log entry to sink: {0}")]
    Transport(String),
}

/// Returned when pushing into a bounded queue that is at capacity.
#[derive(Debug, thiserror::Error)]
#[error("Handoff queue is full ({capacity} batches)")]
pub struct QueueFullError {
    pub capacity: usize,
}
