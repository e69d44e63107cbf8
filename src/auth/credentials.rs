//! Credential extraction from request headers.

use std::net::IpAddr;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::config::AuthConfig;

/// Raw, unverified credentials presented by a caller.
///
/// When both an API key and an `Authorization` header are present, the
/// resolver uses the API key and ignores the bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub service_name: Option<String>,
    /// Raw `Authorization` header value, including the scheme.
    pub authorization: Option<String>,
    pub remote_addr: Option<IpAddr>,
}

impl Credentials {
    /// Pull credentials out of request headers. Blank values count as absent.
    pub fn from_headers(headers: &HeaderMap, config: &AuthConfig, remote_addr: Option<IpAddr>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            api_key: header(&config.api_key_header),
            service_name: header(&config.service_name_header),
            authorization: header(AUTHORIZATION.as_str()),
            remote_addr,
        }
    }

    pub fn service_key(key: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            service_name: Some(service.into()),
            ..Self::default()
        }
    }

    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self {
            authorization: Some(format!("Bearer {}", token.as_ref())),
            ..Self::default()
        }
    }

    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Token part of a `Bearer` authorization header.
    ///
    /// `Some(None)` means a header was sent with another scheme or no token.
    pub(crate) fn bearer_token(&self) -> Option<Option<&str>> {
        self.authorization.as_deref().map(|raw| {
            let (scheme, token) = raw.split_once(' ')?;
            let token = token.trim();
            (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
        })
    }
}
