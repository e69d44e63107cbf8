//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Placeholder shipped in the default config. Rejected by validation.
pub const PLACEHOLDER_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the diagnosis gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deployment environment name (e.g. "production", "staging", "dev").
    pub environment: String,

    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Credential verification settings.
    pub auth: AuthConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Upstream diagnosis generator settings.
    pub generator: GeneratorConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Disclaimer attached to every successful diagnosis response.
    pub medical_disclaimer: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            listener: ListenerConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            generator: GeneratorConfig::default(),
            timeouts: TimeoutConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
            medical_disclaimer: "This diagnosis is AI-generated and should not replace professional \
                medical consultation. Always consult with a qualified healthcare provider for medical advice."
                .to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Credential verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret presented by internal services.
    pub api_key: String,

    /// Header carrying the service API key.
    pub api_key_header: String,

    /// Header carrying the declared service name.
    pub service_name_header: String,

    /// Services allowed to call with the API key.
    pub allowed_services: Vec<String>,

    /// Source addresses allowed to use the API key. Empty = any address.
    pub allowed_networks: Vec<IpAddr>,

    /// HMAC secret for HS256 bearer tokens.
    pub jwt_secret: String,

    /// Scopes granted to callers authenticated by API key.
    pub service_scopes: Vec<String>,

    /// Scopes granted to bearer tokens that carry no `scope` claim.
    pub default_user_scopes: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: placeholders. Validation refuses to start with these.
            api_key: PLACEHOLDER_SECRET.to_string(),
            api_key_header: "X-API-Key".to_string(),
            service_name_header: "X-Service-Name".to_string(),
            allowed_services: vec!["tenderly-backend".to_string()],
            allowed_networks: Vec::new(),
            jwt_secret: PLACEHOLDER_SECRET.to_string(),
            service_scopes: vec![
                "diagnosis:simple".to_string(),
                "diagnosis:structured".to_string(),
            ],
            default_user_scopes: vec![
                "diagnosis:simple".to_string(),
                "diagnosis:structured".to_string(),
            ],
        }
    }
}

/// What the limiter does when the counter store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Admit the request and log the outage.
    FailOpen,
    /// Reject the request as if the quota were exhausted.
    FailClosed,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests admitted per caller per window.
    pub requests: u64,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Behaviour on counter store failure.
    pub store_failure_policy: StoreFailurePolicy,

    /// How often expired counters are swept from the in-memory store.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            window_secs: 3600,
            store_failure_policy: StoreFailurePolicy::FailOpen,
            sweep_interval_secs: 60,
        }
    }
}

/// Upstream diagnosis generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Endpoint accepting generation requests. None = generator unavailable.
    pub endpoint: Option<String>,

    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 30,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Mount the unauthenticated `/diagnosis/structured/test` route.
    pub enable_test_endpoint: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 256 * 1024,
            enable_test_endpoint: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            environment = "staging"

            [auth]
            api_key = "svc-key-0123456789abcdef"
            allowed_services = ["intake"]

            [rate_limit]
            requests = 5
            store_failure_policy = "fail_closed"
            "#,
        )
        .unwrap();

        assert!(!config.is_production());
        assert_eq!(config.auth.api_key_header, "X-API-Key");
        assert_eq!(config.auth.allowed_services, vec!["intake".to_string()]);
        assert_eq!(config.rate_limit.requests, 5);
        assert_eq!(config.rate_limit.window_secs, 3600);
        assert_eq!(config.rate_limit.store_failure_policy, StoreFailurePolicy::FailClosed);
        assert!(!config.security.enable_test_endpoint);
    }

    #[test]
    fn test_network_allow_list_parses_ips() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [auth]
            allowed_networks = ["10.0.0.7", "::1"]
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.allowed_networks.len(), 2);
    }
}
