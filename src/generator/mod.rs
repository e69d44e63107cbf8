//! External diagnosis generation.
//!
//! # Data Flow
//! ```text
//! validated intake
//!     → GenerationRequest
//!     → retry.rs (bounded attempts, exponential backoff with jitter)
//!     → http.rs (POST to the configured generator endpoint)
//!     → GeneratedDiagnosis (untrusted until the safety assessor has run)
//! ```
//!
//! # Design Decisions
//! - The generator is opaque: prompts and model choice live behind the endpoint
//! - Only `UpstreamUnavailable` is retried; malformed output never is
//! - Suggestions are returned verbatim; filtering is the safety assessor's job

pub mod http;
pub mod retry;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::{HttpDiagnosisGenerator, UnconfiguredGenerator};
pub use retry::RetryingGenerator;
pub use types::{
    GeneratedDiagnosis, GenerationRequest, Intake, Investigation, PossibleDiagnosis,
    TreatmentSuggestion,
};

/// Failures reported by a generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("diagnosis generator unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("diagnosis generator returned malformed output: {0}")]
    UpstreamMalformedOutput(String),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::UpstreamUnavailable(_))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::UpstreamUnavailable(_) => "unavailable",
            GenerationError::UpstreamMalformedOutput(_) => "malformed",
        }
    }
}

/// Produces a provisional diagnosis and treatment suggestions.
#[async_trait]
pub trait DiagnosisGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDiagnosis, GenerationError>;

    /// Cheap reachability probe for readiness reporting.
    async fn health_check(&self) -> Result<(), GenerationError> {
        Ok(())
    }
}
