//! HTTP adapter for a remote diagnosis generator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::generator::{DiagnosisGenerator, GeneratedDiagnosis, GenerationError, GenerationRequest};

/// Posts the generation request as JSON and decodes a [`GeneratedDiagnosis`].
///
/// Connection failures, timeouts, 429 and 5xx responses are
/// `UpstreamUnavailable`; anything else that is not a usable 2xx body is
/// `UpstreamMalformedOutput`.
#[derive(Debug, Clone)]
pub struct HttpDiagnosisGenerator {
    client: Client,
    endpoint: Url,
}

impl HttpDiagnosisGenerator {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| GenerationError::UpstreamUnavailable(format!("invalid endpoint: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::UpstreamUnavailable(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn unavailable(e: reqwest::Error) -> GenerationError {
    GenerationError::UpstreamUnavailable(e.to_string())
}

#[async_trait]
impl DiagnosisGenerator for HttpDiagnosisGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDiagnosis, GenerationError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-request-id", &request.request_id)
            .json(request)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::UpstreamUnavailable(format!("upstream returned {status}")));
        }
        if !status.is_success() {
            return Err(GenerationError::UpstreamMalformedOutput(format!(
                "upstream rejected request with {status}"
            )));
        }

        let bytes = response.bytes().await.map_err(unavailable)?;
        let diagnosis: GeneratedDiagnosis = serde_json::from_slice(&bytes)
            .map_err(|e| GenerationError::UpstreamMalformedOutput(e.to_string()))?;
        diagnosis
            .check()
            .map_err(GenerationError::UpstreamMalformedOutput)?;
        Ok(diagnosis)
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        let url = self
            .endpoint
            .join("/health")
            .map_err(|e| GenerationError::UpstreamUnavailable(e.to_string()))?;
        let response = self.client.get(url).send().await.map_err(unavailable)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(GenerationError::UpstreamUnavailable(format!(
                "health probe returned {}",
                response.status()
            )))
        }
    }
}

/// Stand-in used when no endpoint is configured. Every call fails as
/// unavailable so requests surface a 503 instead of a fabricated diagnosis.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl DiagnosisGenerator for UnconfiguredGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedDiagnosis, GenerationError> {
        Err(GenerationError::UpstreamUnavailable(
            "no generator endpoint configured".to_string(),
        ))
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        Err(GenerationError::UpstreamUnavailable(
            "no generator endpoint configured".to_string(),
        ))
    }
}
