//! Azure-style deployment provider.
//!
//! Targets gateways that route by deployment name instead of a `model`
//! body field:
//!
//! ```text
//! POST {base_url}/deployments/{model}/chat/completions/?api-version={version}
//! api-key: {key}
//! ```

use crate::wire;
use async_trait::async_trait;
use lorebot_core::error::ProviderError;
use lorebot_core::provider::{ProviderRequest, ProviderResponse};
use std::time::Duration;
use tracing::debug;

pub struct AzureDeploymentProvider {
    base_url: String,
    api_key: String,
    api_version: String,
    client: reqwest::Client,
}

impl AzureDeploymentProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: api_version.into(),
            client,
        }
    }

    fn deployment_url(&self, deployment: &str) -> String {
        format!("{}/deployments/{}/chat/completions/", self.base_url, deployment)
    }
}

#[async_trait]
impl lorebot_core::Provider for AzureDeploymentProvider {
    fn name(&self) -> &str {
        "azure"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = self.deployment_url(&request.model);
        let body = wire::request_body(&request, false);

        debug!(deployment = %request.model, api_version = %self.api_version, "Sending deployment completion request");

        let response = self
            .client
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        wire::read_completion("azure", &request.model, response).await
    }
}
