//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ConfigIssue};

/// Environment variables that override secrets from the config file.
pub const ENV_API_KEY: &str = "GATEWAY_API_KEY";
pub const ENV_JWT_SECRET: &str = "GATEWAY_JWT_SECRET";
pub const ENV_GENERATOR_URL: &str = "GATEWAY_GENERATOR_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ConfigIssue>),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Replace secret fields with values from the environment, when set.
///
/// `lookup` is injected so tests do not mutate the process environment.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
        config.auth.api_key = key;
    }
    if let Some(secret) = lookup(ENV_JWT_SECRET).filter(|v| !v.is_empty()) {
        config.auth.jwt_secret = secret;
    }
    if let Some(endpoint) = lookup(ENV_GENERATOR_URL).filter(|v| !v.is_empty()) {
        config.generator.endpoint = Some(endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides_replace_secrets() {
        let env: HashMap<&str, &str> = [
            (ENV_API_KEY, "from-env-0123456789"),
            (ENV_JWT_SECRET, ""),
            (ENV_GENERATOR_URL, "http://llm.internal/generate"),
        ]
        .into_iter()
        .collect();

        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.auth.api_key, "from-env-0123456789");
        // Empty values are ignored.
        assert_eq!(config.auth.jwt_secret, crate::config::schema::PLACEHOLDER_SECRET);
        assert_eq!(
            config.generator.endpoint.as_deref(),
            Some("http://llm.internal/generate")
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("gateway-config-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[rate_limit]\nrequests = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("rate_limit.requests"));

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/gateway.toml");
        let content = fs::read_to_string(path).unwrap();
        let config: GatewayConfig = toml::from_str(&content).unwrap();

        assert_eq!(validate_config(&config), Ok(()));
        assert!(!config.is_production());
        assert!(config.generator.endpoint.is_none());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let path = std::env::temp_dir().join(format!("gateway-config-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[rate_limit\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));

        fs::remove_file(&path).unwrap_or_default();
    }
}
