//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject placeholder or weak secrets
//! - Validate value ranges (quota > 0, window > 0, retry attempts bounded)
//! - Refuse the unauthenticated test route in production
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ConfigIssue>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{GatewayConfig, PLACEHOLDER_SECRET};

const MIN_API_KEY_LEN: usize = 16;
const MIN_JWT_SECRET_LEN: usize = 32;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn issue(field: &'static str, message: impl Into<String>) -> ConfigIssue {
    ConfigIssue {
        field,
        message: message.into(),
    }
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(issue("listener.bind_address", "must be a socket address like 0.0.0.0:8000"));
    }

    let auth = &config.auth;
    if auth.api_key == PLACEHOLDER_SECRET {
        issues.push(issue("auth.api_key", "placeholder value must be replaced"));
    } else if auth.api_key.len() < MIN_API_KEY_LEN {
        issues.push(issue(
            "auth.api_key",
            format!("must be at least {MIN_API_KEY_LEN} characters"),
        ));
    }
    if auth.jwt_secret == PLACEHOLDER_SECRET {
        issues.push(issue("auth.jwt_secret", "placeholder value must be replaced"));
    } else if auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
        issues.push(issue(
            "auth.jwt_secret",
            format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
        ));
    }
    if auth.allowed_services.is_empty() {
        issues.push(issue("auth.allowed_services", "at least one service must be allowed"));
    }
    if auth.allowed_services.iter().any(|s| s.trim().is_empty()) {
        issues.push(issue("auth.allowed_services", "service names must not be blank"));
    }
    if auth.api_key_header.trim().is_empty() {
        issues.push(issue("auth.api_key_header", "must not be empty"));
    }
    if auth.service_name_header.trim().is_empty() {
        issues.push(issue("auth.service_name_header", "must not be empty"));
    }

    let rate = &config.rate_limit;
    if rate.requests == 0 {
        issues.push(issue("rate_limit.requests", "must be greater than 0"));
    }
    if rate.window_secs == 0 {
        issues.push(issue("rate_limit.window_secs", "must be greater than 0"));
    }
    if rate.sweep_interval_secs == 0 {
        issues.push(issue("rate_limit.sweep_interval_secs", "must be greater than 0"));
    }

    let generator = &config.generator;
    if !(1..=5).contains(&generator.max_attempts) {
        issues.push(issue("generator.max_attempts", "must be between 1 and 5"));
    }
    if generator.base_delay_ms > generator.max_delay_ms {
        issues.push(issue("generator.base_delay_ms", "must not exceed generator.max_delay_ms"));
    }
    if generator.timeout_secs == 0 {
        issues.push(issue("generator.timeout_secs", "must be greater than 0"));
    }
    if let Some(endpoint) = &generator.endpoint {
        if url::Url::parse(endpoint).is_err() {
            issues.push(issue("generator.endpoint", "must be an absolute URL"));
        }
    }

    if config.timeouts.request_secs == 0 {
        issues.push(issue("timeouts.request_secs", "must be greater than 0"));
    }
    if config.security.max_body_size == 0 {
        issues.push(issue("security.max_body_size", "must be greater than 0"));
    }
    if config.security.enable_test_endpoint && config.is_production() {
        issues.push(issue(
            "security.enable_test_endpoint",
            "the unauthenticated test endpoint cannot be enabled in production",
        ));
    }
    if config.medical_disclaimer.trim().is_empty() {
        issues.push(issue("medical_disclaimer", "must not be empty"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.api_key = "svc-key-0123456789abcdef".to_string();
        config.auth.jwt_secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_default_config_rejects_placeholders() {
        let issues = validate_config(&GatewayConfig::default()).unwrap_err();
        let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
        assert!(fields.contains(&"auth.api_key"));
        assert!(fields.contains(&"auth.jwt_secret"));
    }

    #[test]
    fn test_collects_every_issue() {
        let mut config = valid();
        config.rate_limit.requests = 0;
        config.rate_limit.window_secs = 0;
        config.generator.max_attempts = 9;

        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_test_endpoint_forbidden_in_production() {
        let mut config = valid();
        config.security.enable_test_endpoint = true;
        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues[0].field, "security.enable_test_endpoint");

        config.environment = "dev".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
