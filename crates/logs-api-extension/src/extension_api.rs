// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error};

use crate::error::ExtensionError;
use crate::http_utils::build_client;
use crate::lambda::{AgentIdentity, RegistrationRequest, WorkSlice};

const EXTENSION_API_VERSION: &str = "2020-01-01";
pub const EXTENSION_NAME_HEADER: &str = "Lambda-Extension-Name";
pub const EXTENSION_ID_HEADER: &str = "Lambda-Extension-Identifier";
pub const EXTENSION_ERROR_TYPE_HEADER: &str = "Lambda-Extension-Function-Error-Type";

/// Phase a fatal error happened in, which selects the reporting endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    Init,
    Exit,
}

/// Lifecycle calls against the Lambda Extensions API.
#[async_trait]
pub trait ExtensionApi {
    /// Registers the extension. Must precede every other call.
    async fn register(
        &self,
        agent_name: &str,
        request: &RegistrationRequest,
    ) -> Result<AgentIdentity, ExtensionError>;

    /// Blocks until the platform hands out the next invoke or shutdown event.
    async fn next_slice(&self, agent_id: &AgentIdentity) -> Result<WorkSlice, ExtensionError>;

    /// Tells the platform the extension is about to fail. Best effort.
    async fn report_error(
        &self,
        agent_id: &AgentIdentity,
        phase: ErrorPhase,
        error: &ExtensionError,
    );
}

#[derive(Clone)]
pub struct ExtensionApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExtensionApiClient {
    pub fn new(runtime_api: &str) -> Result<Self, ExtensionError> {
        // no timeout: event/next is a long poll held open until the next event
        let client = build_client(None).map_err(|e| {
            ExtensionError::Registration(format!("unable to build HTTP client: {e}"))
        })?;
        Ok(ExtensionApiClient {
            client,
            base_url: format!("http://{runtime_api}/{EXTENSION_API_VERSION}/extension"),
        })
    }
}

#[async_trait]
impl ExtensionApi for ExtensionApiClient {
    async fn register(
        &self,
        agent_name: &str,
        request: &RegistrationRequest,
    ) -> Result<AgentIdentity, ExtensionError> {
        let url = format!("{}/register", self.base_url);
        debug!("Registering extension {agent_name} at {url}");

        let response = self
            .client
            .post(&url)
            .header(EXTENSION_NAME_HEADER, agent_name)
            .json(request)
            .send()
            .await
            .map_err(|e| ExtensionError::Registration(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtensionError::Registration(format!(
                "unexpected status {status}: {body}"
            )));
        }

        let agent_id = response
            .headers()
            .get(EXTENSION_ID_HEADER)
            .and_then(|val| val.to_str().ok())
            .filter(|val| !val.is_empty())
            .ok_or_else(|| {
                ExtensionError::Registration(format!(
                    "response is missing the {EXTENSION_ID_HEADER} header"
                ))
            })?;

        debug!("Extension registered with id {agent_id}");
        Ok(AgentIdentity::new(agent_id))
    }

    async fn next_slice(&self, agent_id: &AgentIdentity) -> Result<WorkSlice, ExtensionError> {
        let response = self
            .client
            .get(format!("{}/event/next", self.base_url))
            .header(EXTENSION_ID_HEADER, agent_id.as_str())
            .send()
            .await
            .map_err(|e| ExtensionError::Lifecycle(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtensionError::Lifecycle(format!(
                "unexpected status {status}: {body}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ExtensionError::Lifecycle(e.to_string()))?;
        serde_json::from_slice::<WorkSlice>(&body)
            .map_err(|e| ExtensionError::Lifecycle(format!("unable to parse event: {e}")))
    }

    async fn report_error(
        &self,
        agent_id: &AgentIdentity,
        phase: ErrorPhase,
        error: &ExtensionError,
    ) {
        let path = match phase {
            ErrorPhase::Init => "init/error",
            ErrorPhase::Exit => "exit/error",
        };
        let error_type = error.error_type();
        let result = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .header(EXTENSION_ID_HEADER, agent_id.as_str())
            .header(EXTENSION_ERROR_TYPE_HEADER, error_type)
            .json(&json!({
                "errorMessage": error.to_string(),
                "errorType": error_type,
            }))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => debug!("Reported {error_type} to {path}"),
            Ok(resp) => error!("Unable to report {error_type} to {path}: status {}", resp.status()),
            Err(e) => error!("Unable to report {error_type} to {path}: {e}"),
        }
    }
}
