// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtensionError;
use crate::extension_api::EXTENSION_ID_HEADER;
use crate::http_utils::build_client;
use crate::lambda::{AgentIdentity, SubscriptionRequest};

const LOGS_API_VERSION: &str = "2020-08-15";

#[async_trait]
pub trait LogsApi {
    /// Asks the platform to start pushing logs to `request.destination`. The listener behind
    /// that destination must already be accepting connections.
    async fn subscribe(
        &self,
        agent_id: &AgentIdentity,
        request: &SubscriptionRequest,
    ) -> Result<(), ExtensionError>;
}

#[derive(Clone)]
pub struct LogsApiClient {
    client: reqwest::Client,
    url: String,
}

impl LogsApiClient {
    pub fn new(runtime_api: &str) -> Result<Self, ExtensionError> {
        // no client-side timeout: the platform decides how long subscribe takes
        let client = build_client(None).map_err(|e| {
            ExtensionError::Subscription(format!("unable to build HTTP client: {e}"))
        })?;
        Ok(LogsApiClient {
            client,
            url: format!("http://{runtime_api}/{LOGS_API_VERSION}/logs"),
        })
    }
}

#[async_trait]
impl LogsApi for LogsApiClient {
    async fn subscribe(
        &self,
        agent_id: &AgentIdentity,
        request: &SubscriptionRequest,
    ) -> Result<(), ExtensionError> {
        debug!(
            "Subscribing to Logs API, destination {}",
            request.destination.uri
        );
        let response = self
            .client
            .put(&self.url)
            .header(EXTENSION_ID_HEADER, agent_id.as_str())
            .json(request)
            .send()
            .await
            .map_err(|e| ExtensionError::Subscription(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ExtensionError::Subscription(format!(
                "unexpected status {status}: {body}"
            )));
        }
        debug!("Subscribed to Logs API: {body}");
        Ok(())
    }
}
