//! Per-request caller context.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderName;

use crate::auth::Credentials;
use crate::http::server::AppState;
use crate::pipeline::{CallContext, Pipeline};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The pipeline snapshot serving this request plus the caller's credentials.
///
/// The snapshot is taken once, so a config reload mid-request cannot mix
/// two configurations.
pub struct Caller {
    pub pipeline: Arc<Pipeline>,
    pub call: CallContext,
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let pipeline = state.pipeline();
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        // SetRequestIdLayer runs first, so this is only missing outside the router.
        let request_id = parts
            .headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let credentials = Credentials::from_headers(&parts.headers, pipeline.auth_config(), remote_addr);

        Ok(Self {
            pipeline,
            call: CallContext {
                request_id,
                credentials,
            },
        })
    }
}
