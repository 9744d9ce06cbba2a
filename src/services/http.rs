//! reqwest-backed transport posting batches to the signals query endpoint

use std::time::Instant;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ConfigError, DataAccessConfig};
use crate::error::FetchError;
use crate::query::{QueryResponse, SignalSetQuery};
use crate::services::transport::SignalsTransport;

pub struct HttpTransport {
    endpoint: Url,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &DataAccessConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        // Only fails when the TLS backend cannot be initialised.
        let client = builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build configured HTTP client, using defaults");
            Client::new()
        });
        Ok(Self::with_client(config.query_url()?, client))
    }

    pub fn with_client(endpoint: Url, client: Client) -> Self {
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl SignalsTransport for HttpTransport {
    async fn query(&self, queries: &[SignalSetQuery]) -> Result<Vec<QueryResponse>, FetchError> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(queries)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let results: Vec<QueryResponse> = serde_json::from_slice(&bytes)?;

        debug!(
            endpoint = %self.endpoint,
            queries = queries.len(),
            results = results.len(),
            duration_ms = start.elapsed().as_millis(),
            "Signals query completed"
        );

        Ok(results)
    }
}
