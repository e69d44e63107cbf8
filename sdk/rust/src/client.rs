//! Typed async client for the diagnosis gateway.
//!
//! ```no_run
//! # async fn run() -> Result<(), gateway_sdk::SdkError> {
//! use gateway_sdk::{Credentials, DiagnosisClient};
//!
//! let client = DiagnosisClient::new(
//!     "http://localhost:8000",
//!     Credentials::service_key("svc-key-0123456789abcdef", "tenderly-backend"),
//! );
//! let quota = client.quota().await?;
//! println!("{} requests left", quota.remaining);
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const SERVICE_NAME_HEADER: &str = "X-Service-Name";

/// How the client authenticates.
#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceKey { api_key: String, service_name: String },
    Bearer(String),
    Anonymous,
}

impl Credentials {
    pub fn service_key(api_key: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self::ServiceKey {
            api_key: api_key.into(),
            service_name: service_name.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with an error body.
    #[error("gateway returned {status} ({}): {}", .body.error_code, .body.error)]
    Api { status: StatusCode, body: ApiErrorBody },

    /// Non-success status whose body was not a gateway error.
    #[error("unexpected status {status}: {text}")]
    Unexpected { status: StatusCode, text: String },

    #[error("response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SdkError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SdkError::Api { status, .. } | SdkError::Unexpected { status, .. } => Some(*status),
            SdkError::Transport(e) => e.status(),
            SdkError::Decode(_) => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            SdkError::Api { body, .. } => Some(&body.error_code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub error_code: String,
    pub request_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

/// Simple symptom-list request.
#[derive(Debug, Clone, Serialize)]
pub struct SimpleDiagnosisRequest {
    pub symptoms: Vec<String>,
    pub patient_age: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_level: Option<String>,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progression: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PossibleDiagnosis {
    pub name: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentSuggestion {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SafetyAssessment {
    pub allergic_medications: Vec<String>,
    pub safe_alternatives: Vec<String>,
    pub contraindicated_drugs: Vec<String>,
    pub condition_interactions: Vec<String>,
    pub warnings: Vec<String>,
    /// Unresolved safety gaps, kept loose so new kinds do not break clients.
    #[serde(default)]
    pub gaps: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskAssessment {
    pub urgency_level: String,
    pub red_flags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosisResponse {
    pub request_id: String,
    pub patient_age: u8,
    #[serde(default)]
    pub primary_symptom: Option<String>,
    pub possible_diagnoses: Vec<PossibleDiagnosis>,
    pub clinical_reasoning: String,
    pub differential_considerations: Vec<String>,
    pub safety_assessment: SafetyAssessment,
    pub risk_assessment: RiskAssessment,
    pub recommended_investigations: Vec<Value>,
    pub recommended_medications: Vec<TreatmentSuggestion>,
    pub patient_education: Vec<String>,
    pub confidence_score: f64,
    pub disclaimer: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub request_id: String,
    pub primary_symptom: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QuotaStatus {
    pub limit: u64,
    pub remaining: u64,
    pub window_seconds: u64,
    pub reset_after_seconds: u64,
}

pub struct DiagnosisClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl DiagnosisClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self::with_client(Client::new(), base_url, credentials)
    }

    pub fn with_client(client: Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::ServiceKey { api_key, service_name } => request
                .header(API_KEY_HEADER, api_key)
                .header(SERVICE_NAME_HEADER, service_name),
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Anonymous => request,
        }
    }

    /// Diagnose from a plain symptom list.
    pub async fn diagnose(&self, request: &SimpleDiagnosisRequest) -> Result<DiagnosisResponse, SdkError> {
        let resp = self
            .authorize(self.client.post(self.url("/diagnosis")))
            .json(request)
            .send()
            .await?;
        decode(resp).await
    }

    /// Diagnose from a structured intake payload.
    pub async fn diagnose_structured(&self, payload: &Value) -> Result<DiagnosisResponse, SdkError> {
        let resp = self
            .authorize(self.client.post(self.url("/diagnosis/structured")))
            .json(payload)
            .send()
            .await?;
        decode(resp).await
    }

    /// Run the structured validator without generating a diagnosis.
    pub async fn validate(&self, payload: &Value) -> Result<ValidationReport, SdkError> {
        let resp = self
            .authorize(self.client.post(self.url("/diagnosis/validate")))
            .json(payload)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn quota(&self) -> Result<QuotaStatus, SdkError> {
        let resp = self
            .authorize(self.client.get(self.url("/diagnosis/quota")))
            .send()
            .await?;
        decode(resp).await
    }

    /// Dependency health report, returned as sent.
    pub async fn health(&self) -> Result<Value, SdkError> {
        let resp = self.client.get(self.url("/health")).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SdkError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => SdkError::Api { status, body },
            Err(_) => SdkError::Unexpected { status, text },
        });
    }

    Ok(serde_json::from_str(&text)?)
}
