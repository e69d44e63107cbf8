//! Resolved caller identity.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::auth::AuthError;

/// Scope required by `POST /diagnosis`.
pub const SCOPE_SIMPLE: &str = "diagnosis:simple";
/// Scope required by the structured diagnosis endpoints.
pub const SCOPE_STRUCTURED: &str = "diagnosis:structured";

/// How the caller proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    ServiceKey,
    UserToken,
}

impl IdentityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::ServiceKey => "service_key",
            IdentityKind::UserToken => "user_token",
        }
    }
}

/// The verified identity of one request. Never persisted.
///
/// Fields are private so a resolved principal cannot be altered downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    identity_kind: IdentityKind,
    identity_id: String,
    allowed_scopes: BTreeSet<String>,
    issued_at: u64,
    expires_at: Option<u64>,
}

impl Principal {
    pub(crate) fn new(
        identity_kind: IdentityKind,
        identity_id: String,
        allowed_scopes: BTreeSet<String>,
        issued_at: u64,
        expires_at: Option<u64>,
    ) -> Self {
        Self {
            identity_kind,
            identity_id,
            allowed_scopes,
            issued_at,
            expires_at,
        }
    }

    pub fn identity_kind(&self) -> IdentityKind {
        self.identity_kind
    }

    /// Namespaced id: `service:<name>` or `user:<subject>`.
    pub fn identity_id(&self) -> &str {
        &self.identity_id
    }

    pub fn allowed_scopes(&self) -> &BTreeSet<String> {
        &self.allowed_scopes
    }

    pub fn issued_at(&self) -> u64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.allowed_scopes.contains(scope)
    }

    pub fn require_scope(&self, scope: &str) -> Result<(), AuthError> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(AuthError::ScopeDenied(scope.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_checks() {
        let principal = Principal::new(
            IdentityKind::UserToken,
            "user:42".to_string(),
            [SCOPE_SIMPLE.to_string()].into_iter().collect(),
            100,
            Some(200),
        );

        assert!(principal.require_scope(SCOPE_SIMPLE).is_ok());
        assert_eq!(
            principal.require_scope(SCOPE_STRUCTURED),
            Err(AuthError::ScopeDenied(SCOPE_STRUCTURED.to_string()))
        );
    }
}
