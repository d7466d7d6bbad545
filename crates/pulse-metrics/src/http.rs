use std::time::Duration;

use async_trait::async_trait;
use pulse_core::{MetricDatum, SinkError};

use crate::sink::MetricsSink;

/// POSTs each datum as a JSON body to a metrics ingestion endpoint.
#[derive(Debug)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Transport(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(endpoint = %endpoint, timeout_ms = timeout.as_millis() as u64, "HTTP sink initialized");
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MetricsSink for HttpSink {
    async fn put_metric(&self, datum: &MetricDatum) -> Result<(), SinkError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(datum)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
