//! Terminal request failures.

use thiserror::Error;

use crate::auth::AuthError;
use crate::generator::GenerationError;
use crate::intake::ValidationError;
use crate::rate_limit::{RateLimitError, StoreError};

/// The first failing stage's error. No later stage has run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Quota lookups read the store directly and cannot fail open.
    #[error(transparent)]
    QuotaUnavailable(#[from] StoreError),
}

impl PipelineError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Auth(e) => e.kind(),
            PipelineError::RateLimited(_) => "quota_exceeded",
            PipelineError::Validation(_) => "validation",
            PipelineError::Generation(e) => e.kind(),
            PipelineError::QuotaUnavailable(_) => "store_unavailable",
        }
    }

    /// Machine-readable code for response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Auth(AuthError::ScopeDenied(_)) => "AUTHORIZATION_ERROR",
            PipelineError::Auth(_) => "AUTHENTICATION_ERROR",
            PipelineError::RateLimited(_) => "RATE_LIMIT_ERROR",
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::Generation(_) => "GENERATION_ERROR",
            PipelineError::QuotaUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}
