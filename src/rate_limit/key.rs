//! Rate limit key derivation.

use std::fmt;
use std::net::IpAddr;

use crate::auth::Principal;

/// Counter identity for one logical caller.
///
/// Derived from the principal when there is one, otherwise from the peer
/// address. The same caller always maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn for_principal(principal: &Principal) -> Self {
        Self(format!("id:{}", principal.identity_id()))
    }

    pub fn for_address(addr: IpAddr) -> Self {
        Self(format!("ip:{}", addr.to_canonical()))
    }

    /// Prefer the principal, fall back to the address.
    pub fn derive(principal: Option<&Principal>, addr: Option<IpAddr>) -> Self {
        match (principal, addr) {
            (Some(p), _) => Self::for_principal(p),
            (None, Some(addr)) => Self::for_address(addr),
            (None, None) => Self("anonymous".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
