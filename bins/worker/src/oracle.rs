//! HTTP client for the account classification service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tally_core::resolver::{ClassificationOracle, ClassificationRequest, OracleError};
use tally_shared::config::ClassifierConfig;

/// Posts the chart and description to the configured endpoint and returns
/// the raw response body. Parsing and validation happen in the resolver.
pub struct HttpClassificationOracle {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OracleCall<'a> {
    model: &'a str,
    #[serde(flatten)]
    request: &'a ClassificationRequest,
}

impl HttpClassificationOracle {
    /// Builds the client, or `None` when no endpoint is configured.
    pub fn from_config(config: &ClassifierConfig) -> anyhow::Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };
        // The resolver enforces the per-call timeout; this only bounds stuck sockets.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.saturating_mul(2)))
            .gzip(true)
            .build()?;
        Ok(Some(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }))
    }
}

#[async_trait]
impl ClassificationOracle for HttpClassificationOracle {
    async fn classify(&self, request: &ClassificationRequest) -> Result<String, OracleError> {
        let mut req = self.client.post(&self.endpoint).json(&OracleCall {
            model: &self.model,
            request,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))
    }
}
