//! Caller authentication and authorization scoping.
//!
//! # Data Flow
//! ```text
//! request headers + peer address
//!     → credentials.rs (extract API key / service name / Authorization)
//!     → resolver.rs (verify service key or bearer token)
//!     → principal.rs (normalized, immutable identity + scopes)
//! ```
//!
//! # Design Decisions
//! - Service-key mode takes precedence when both credential forms are sent;
//!   the bearer token is then ignored entirely, never used as a fallback
//! - Secrets are compared in constant time
//! - Resolution is pure: no shared state is touched

pub mod credentials;
pub mod principal;
pub mod resolver;
pub mod token;

use thiserror::Error;

pub use credentials::Credentials;
pub use principal::{IdentityKind, Principal, SCOPE_SIMPLE, SCOPE_STRUCTURED};
pub use resolver::IdentityResolver;
pub use token::{TokenClaims, TokenCodec, TokenError};

/// Authentication and authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credentials supplied; send an X-API-Key with X-Service-Name (takes precedence) or a Bearer token")]
    MissingCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("service '{0}' is not allowed")]
    ServiceNotAllowed(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("missing required scope '{0}'")]
    ScopeDenied(String),
}

impl AuthError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::ServiceNotAllowed(_) => "service_not_allowed",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ScopeDenied(_) => "scope_denied",
        }
    }
}
