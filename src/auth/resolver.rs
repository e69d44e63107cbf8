//! Identity resolution for the two credential modes.
//!
//! # Service-key mode
//! The key is hashed and compared in constant time against the configured
//! secret, then the declared service name is checked against the allow-list,
//! then (when configured) the peer address against the network allow-list.
//! A wrong key is always `InvalidCredentials`, whatever else is wrong.
//!
//! # Bearer-token mode
//! HS256 signature first, then `now < exp`.

use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::auth::principal::{IdentityKind, Principal};
use crate::auth::token::{TokenCodec, TokenError};
use crate::auth::{AuthError, Credentials};
use crate::clock::TimeSource;
use crate::config::AuthConfig;

const MAX_SERVICE_NAME_LEN: usize = 64;

/// Verifies credentials and produces a [`Principal`].
#[derive(Clone)]
pub struct IdentityResolver {
    api_key_digest: [u8; 32],
    allowed_services: HashSet<String>,
    allowed_networks: Vec<IpAddr>,
    codec: TokenCodec,
    service_scopes: BTreeSet<String>,
    default_user_scopes: BTreeSet<String>,
    clock: Arc<dyn TimeSource>,
}

impl IdentityResolver {
    pub fn new(config: &AuthConfig, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            api_key_digest: Sha256::digest(config.api_key.as_bytes()).into(),
            allowed_services: config.allowed_services.iter().cloned().collect(),
            allowed_networks: config.allowed_networks.clone(),
            codec: TokenCodec::new(&config.jwt_secret),
            service_scopes: config.service_scopes.iter().cloned().collect(),
            default_user_scopes: config.default_user_scopes.iter().cloned().collect(),
            clock,
        }
    }

    /// Resolve credentials to a principal. Service-key mode wins when both
    /// credential forms are present.
    pub fn resolve(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        if let Some(key) = credentials.api_key.as_deref() {
            return self.resolve_service(key, credentials);
        }
        match credentials.bearer_token() {
            Some(Some(token)) => self.resolve_token(token),
            Some(None) => Err(AuthError::InvalidCredentials),
            None => Err(AuthError::MissingCredentials),
        }
    }

    fn resolve_service(&self, key: &str, credentials: &Credentials) -> Result<Principal, AuthError> {
        let presented: [u8; 32] = Sha256::digest(key.as_bytes()).into();
        if !bool::from(presented.as_slice().ct_eq(self.api_key_digest.as_slice())) {
            return Err(AuthError::InvalidCredentials);
        }

        let service = credentials
            .service_name
            .as_deref()
            .filter(|name| is_well_formed_service_name(name))
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.allowed_services.contains(service) {
            tracing::warn!(service = %service, "Request from service outside the allow-list");
            return Err(AuthError::ServiceNotAllowed(service.to_string()));
        }

        if !self.allowed_networks.is_empty() {
            let permitted = credentials
                .remote_addr
                .is_some_and(|addr| self.allowed_networks.iter().any(|allowed| same_ip(*allowed, addr)));
            if !permitted {
                tracing::warn!(service = %service, remote_addr = ?credentials.remote_addr, "Service key used from unlisted address");
                return Err(AuthError::InvalidCredentials);
            }
        }

        Ok(Principal::new(
            IdentityKind::ServiceKey,
            format!("service:{service}"),
            self.service_scopes.clone(),
            self.clock.now(),
            None,
        ))
    }

    fn resolve_token(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.codec.verify(token).map_err(|e| match e {
            TokenError::InvalidClaims(_) => AuthError::InvalidCredentials,
            TokenError::Malformed
            | TokenError::UnsupportedAlgorithm(_)
            | TokenError::BadSignature
            | TokenError::InvalidKey => AuthError::InvalidSignature,
        })?;

        if claims.sub.trim().is_empty() || claims.iat > claims.exp {
            return Err(AuthError::InvalidCredentials);
        }
        if self.clock.now() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }

        let scopes = match claims.scope.as_deref() {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => self.default_user_scopes.clone(),
        };

        Ok(Principal::new(
            IdentityKind::UserToken,
            format!("user:{}", claims.sub),
            scopes,
            claims.iat,
            Some(claims.exp),
        ))
    }
}

fn is_well_formed_service_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_SERVICE_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// IPv4 and IPv4-mapped IPv6 forms of the same address compare equal.
fn same_ip(a: IpAddr, b: IpAddr) -> bool {
    a.to_canonical() == b.to_canonical()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenClaims;
    use crate::auth::{SCOPE_SIMPLE, SCOPE_STRUCTURED};
    use crate::clock::ManualTimeSource;
    use proptest::prelude::*;

    const KEY: &str = "svc-key-0123456789abcdef";
    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const NOW: u64 = 1_750_000_000;

    fn config() -> AuthConfig {
        AuthConfig {
            api_key: KEY.to_string(),
            allowed_services: vec!["tenderly-backend".to_string()],
            jwt_secret: SECRET.to_string(),
            ..AuthConfig::default()
        }
    }

    fn resolver_with(config: &AuthConfig) -> IdentityResolver {
        IdentityResolver::new(config, Arc::new(ManualTimeSource::new(NOW)))
    }

    fn token(sub: &str, iat: u64, exp: u64, scope: Option<&str>) -> String {
        TokenCodec::new(SECRET)
            .sign(&TokenClaims {
                sub: sub.to_string(),
                iat,
                exp,
                scope: scope.map(str::to_string),
            })
            .unwrap()
    }

    #[test]
    fn test_service_key_resolves() {
        let principal = resolver_with(&config())
            .resolve(&Credentials::service_key(KEY, "tenderly-backend"))
            .unwrap();

        assert_eq!(principal.identity_kind(), IdentityKind::ServiceKey);
        assert_eq!(principal.identity_id(), "service:tenderly-backend");
        assert!(principal.has_scope(SCOPE_STRUCTURED));
        assert_eq!(principal.issued_at(), NOW);
        assert_eq!(principal.expires_at(), None);
    }

    #[test]
    fn test_unknown_service_is_not_allowed() {
        let err = resolver_with(&config())
            .resolve(&Credentials::service_key(KEY, "billing"))
            .unwrap_err();
        assert_eq!(err, AuthError::ServiceNotAllowed("billing".to_string()));
    }

    #[test]
    fn test_missing_or_malformed_service_name_is_invalid() {
        let resolver = resolver_with(&config());
        let no_name = Credentials {
            api_key: Some(KEY.to_string()),
            ..Credentials::default()
        };
        assert_eq!(resolver.resolve(&no_name), Err(AuthError::InvalidCredentials));
        assert_eq!(
            resolver.resolve(&Credentials::service_key(KEY, "bad name;drop")),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_network_allow_list() {
        let mut cfg = config();
        cfg.allowed_networks = vec!["10.0.0.7".parse().unwrap()];
        let resolver = resolver_with(&cfg);
        let creds = Credentials::service_key(KEY, "tenderly-backend");

        assert_eq!(resolver.resolve(&creds), Err(AuthError::InvalidCredentials));
        assert_eq!(
            resolver.resolve(&creds.clone().with_remote_addr("10.0.0.8".parse().unwrap())),
            Err(AuthError::InvalidCredentials)
        );
        assert!(resolver
            .resolve(&creds.clone().with_remote_addr("10.0.0.7".parse().unwrap()))
            .is_ok());
        assert!(resolver
            .resolve(&creds.with_remote_addr("::ffff:10.0.0.7".parse().unwrap()))
            .is_ok());
    }

    #[test]
    fn test_no_credentials() {
        assert_eq!(
            resolver_with(&config()).resolve(&Credentials::default()),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_bearer_token_resolves_with_claimed_scopes() {
        let principal = resolver_with(&config())
            .resolve(&Credentials::bearer(token("u-1", NOW - 10, NOW + 3600, Some(SCOPE_SIMPLE))))
            .unwrap();

        assert_eq!(principal.identity_kind(), IdentityKind::UserToken);
        assert_eq!(principal.identity_id(), "user:u-1");
        assert!(principal.has_scope(SCOPE_SIMPLE));
        assert!(!principal.has_scope(SCOPE_STRUCTURED));
        assert_eq!(principal.expires_at(), Some(NOW + 3600));
    }

    #[test]
    fn test_bearer_without_scope_claim_gets_defaults() {
        let principal = resolver_with(&config())
            .resolve(&Credentials::bearer(token("u-2", NOW, NOW + 60, None)))
            .unwrap();
        assert!(principal.has_scope(SCOPE_STRUCTURED));
    }

    #[test]
    fn test_expired_token() {
        let err = resolver_with(&config())
            .resolve(&Credentials::bearer(token("u-1", NOW - 7200, NOW - 3600, None)))
            .unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);

        // Expiry is exclusive: a token is dead at exactly `exp`.
        let err = resolver_with(&config())
            .resolve(&Credentials::bearer(token("u-1", NOW - 60, NOW, None)))
            .unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
    }

    #[test]
    fn test_foreign_signature() {
        let foreign = TokenCodec::new("another-secret-another-secret-xx")
            .sign(&TokenClaims {
                sub: "u-1".to_string(),
                iat: NOW,
                exp: NOW + 60,
                scope: None,
            })
            .unwrap();
        assert_eq!(
            resolver_with(&config()).resolve(&Credentials::bearer(foreign)),
            Err(AuthError::InvalidSignature)
        );
        assert_eq!(
            resolver_with(&config()).resolve(&Credentials::bearer("garbage")),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_non_bearer_scheme_is_invalid() {
        let creds = Credentials {
            authorization: Some("Basic Zm9vOmJhcg==".to_string()),
            ..Credentials::default()
        };
        assert_eq!(resolver_with(&config()).resolve(&creds), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn test_service_key_takes_precedence_over_token() {
        let resolver = resolver_with(&config());
        let valid_token = token("u-1", NOW, NOW + 60, None);

        let both = Credentials {
            authorization: Some(format!("Bearer {valid_token}")),
            ..Credentials::service_key(KEY, "tenderly-backend")
        };
        assert_eq!(resolver.resolve(&both).unwrap().identity_kind(), IdentityKind::ServiceKey);

        // A bad key never falls back to a valid token.
        let bad_key = Credentials {
            authorization: Some(format!("Bearer {valid_token}")),
            ..Credentials::service_key("wrong", "tenderly-backend")
        };
        assert_eq!(resolver.resolve(&bad_key), Err(AuthError::InvalidCredentials));
    }

    proptest! {
        #[test]
        fn prop_wrong_key_is_always_invalid_credentials(
            key in "[ -~]{0,64}",
            service in "[a-z][a-z0-9-]{0,20}",
        ) {
            prop_assume!(key != KEY);
            let err = resolver_with(&config())
                .resolve(&Credentials::service_key(key, service))
                .unwrap_err();
            prop_assert_eq!(err, AuthError::InvalidCredentials);
        }
    }
}
