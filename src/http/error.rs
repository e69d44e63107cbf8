//! Error and quota header mapping.

use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER, WWW_AUTHENTICATE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::generator::GenerationError;
use crate::intake::FieldError;
use crate::pipeline::PipelineError;
use crate::rate_limit::{QuotaStatus, RateLimitError};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    error_code: &'static str,
    request_id: &'a str,
    timestamp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

/// A pipeline failure bound to the request it ended.
#[derive(Debug)]
pub struct ApiError {
    pub error: PipelineError,
    pub request_id: String,
    pub timestamp: String,
}

impl ApiError {
    pub fn new(error: PipelineError, request_id: impl Into<String>, timestamp: String) -> Self {
        Self {
            error,
            request_id: request_id.into(),
            timestamp,
        }
    }
}

pub fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Auth(AuthError::ScopeDenied(_)) => StatusCode::FORBIDDEN,
        PipelineError::Auth(_) => StatusCode::UNAUTHORIZED,
        PipelineError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        PipelineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Generation(GenerationError::UpstreamUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Generation(GenerationError::UpstreamMalformedOutput(_)) => StatusCode::BAD_GATEWAY,
        PipelineError::QuotaUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        let body = ErrorBody {
            error: self.error.to_string(),
            error_code: self.error.error_code(),
            request_id: &self.request_id,
            timestamp: &self.timestamp,
            errors: match &self.error {
                PipelineError::Validation(v) => Some(v.errors.as_slice()),
                _ => None,
            },
        };
        let mut response = (status, Json(body)).into_response();

        let headers = response.headers_mut();
        match &self.error {
            PipelineError::Auth(AuthError::ScopeDenied(_)) => {}
            PipelineError::Auth(_) => {
                headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey, Bearer"));
            }
            PipelineError::RateLimited(RateLimitError::QuotaExceeded { retry_after_secs }) => {
                headers.insert(RETRY_AFTER, HeaderValue::from(*retry_after_secs));
            }
            _ => {}
        }
        response
    }
}

/// Attach `X-RateLimit-*` headers when the request was metered.
pub fn with_quota(mut response: Response, quota: Option<QuotaStatus>) -> Response {
    if let Some(quota) = quota {
        let headers = response.headers_mut();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(quota.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(quota.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(quota.reset_after_seconds));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{FieldErrorReason, ValidationError};
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_authentication_error_shape() {
        let response = ApiError::new(AuthError::MissingCredentials.into(), "req-1", "2025-01-01T00:00:00Z".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "ApiKey, Bearer");

        let body = body_json(response).await;
        assert_eq!(body["error_code"], "AUTHENTICATION_ERROR");
        assert_eq!(body["request_id"], "req-1");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let error = RateLimitError::QuotaExceeded { retry_after_secs: 17 }.into();
        let response = ApiError::new(error, "req-2", String::new()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "17");
    }

    #[tokio::test]
    async fn test_validation_lists_field_errors() {
        let error = ValidationError::single(FieldError::new(
            "patient_profile.age",
            FieldErrorReason::OutOfRange,
            "must be between 12 and 100",
        ));
        let response = ApiError::new(error.into(), "req-3", String::new()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["path"], "patient_profile.age");
        assert_eq!(body["errors"][0]["reason"], "out_of_range");
    }

    #[test]
    fn test_generation_statuses() {
        assert_eq!(
            status_for(&GenerationError::UpstreamUnavailable(String::new()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&GenerationError::UpstreamMalformedOutput(String::new()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&AuthError::ScopeDenied("x".into()).into()),
            StatusCode::FORBIDDEN
        );
    }
}
