//! Route handlers.
//!
//! Handlers only translate between HTTP and the pipeline; every decision is
//! made in `Pipeline`.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::health;
use crate::http::error::{with_quota, ApiError};
use crate::http::extract::Caller;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{Outcome, PipelineError};

fn respond<T: Serialize>(
    route: &'static str,
    start: Instant,
    caller: &Caller,
    result: Result<Outcome<T>, PipelineError>,
) -> Response {
    let response = match result {
        Ok(outcome) => with_quota((StatusCode::OK, Json(outcome.body)).into_response(), outcome.quota),
        Err(error) => ApiError::new(error, caller.call.request_id.as_str(), caller.pipeline.now_rfc3339()).into_response(),
    };
    metrics::record_request(route, response.status().as_u16(), start);
    response
}

pub async fn diagnose(caller: Caller, body: Bytes) -> Response {
    let start = Instant::now();
    let result = caller.pipeline.diagnose_simple(&caller.call, &body).await;
    respond("diagnosis", start, &caller, result)
}

pub async fn diagnose_structured(caller: Caller, body: Bytes) -> Response {
    let start = Instant::now();
    let result = caller.pipeline.diagnose_structured(&caller.call, &body).await;
    respond("diagnosis_structured", start, &caller, result)
}

/// Unauthenticated variant. The route is only mounted when enabled, and the
/// flag is checked again per request so a reload that disables it takes
/// effect immediately.
pub async fn diagnose_structured_test(caller: Caller, body: Bytes) -> Response {
    let start = Instant::now();
    if !caller.pipeline.test_endpoint_enabled() {
        metrics::record_request("diagnosis_structured_test", 404, start);
        return StatusCode::NOT_FOUND.into_response();
    }
    let result = caller
        .pipeline
        .diagnose_structured_unauthenticated(&caller.call, &body)
        .await;
    respond("diagnosis_structured_test", start, &caller, result)
}

pub async fn validate(caller: Caller, body: Bytes) -> Response {
    let start = Instant::now();
    let result = caller.pipeline.validate_only(&caller.call, &body).await;
    respond("diagnosis_validate", start, &caller, result)
}

pub async fn quota(caller: Caller) -> Response {
    let start = Instant::now();
    let result = caller.pipeline.quota(&caller.call).await.map(|status| Outcome {
        body: status,
        quota: Some(status),
    });
    respond("diagnosis_quota", start, &caller, result)
}

pub async fn health(State(state): State<AppState>) -> Response {
    let report = health::check(&state.pipeline(), state.environment(), state.uptime()).await;
    Json(report).into_response()
}

pub async fn live() -> Response {
    Json(json!({ "status": "alive" })).into_response()
}

pub async fn ready(State(state): State<AppState>) -> Response {
    let readiness = health::readiness(&state.pipeline()).await;
    let status = if readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(readiness)).into_response()
}

pub async fn banner() -> Response {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/api/v1/health",
    }))
    .into_response()
}
