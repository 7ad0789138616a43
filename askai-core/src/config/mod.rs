//! Configuration for the relay
//!
//! Configuration comes from the environment (the usual deployment) or from a
//! YAML/JSON file with `${VAR}` interpolation. Either way it is validated once
//! at startup and then shared read-only by every request.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::{interpolate_env_vars, ProcessEnv, VarSource};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{CredentialMode, RelayConfig, API_KEY_VAR, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use secrets::{redact_url, SecretString};
pub use validator::ConfigValidator;

use crate::providers::retry::{BackoffPlan, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use env::{parse_var, read_var};
use std::fs;
use std::path::Path;

pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";
pub const CREDENTIAL_MODE_VAR: &str = "GEMINI_CREDENTIAL_MODE";
pub const MAX_ATTEMPTS_VAR: &str = "ASKAI_MAX_ATTEMPTS";
pub const BASE_DELAY_VAR: &str = "ASKAI_BASE_DELAY_MS";
pub const UPSTREAM_TIMEOUT_VAR: &str = "ASKAI_UPSTREAM_TIMEOUT_SECS";

impl RelayConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(&ProcessEnv)
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_vars(vars: &dyn VarSource) -> ConfigResult<Self> {
        let api_key = read_var(vars, API_KEY_VAR).ok_or_else(|| ConfigError::MissingCredential {
            var: API_KEY_VAR.to_string(),
        })?;

        let config = RelayConfig {
            api_key: SecretString::new(api_key),
            model: read_var(vars, MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: read_var(vars, BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            credential_mode: parse_var(vars, CREDENTIAL_MODE_VAR, CredentialMode::default())?,
            upstream_timeout_secs: parse_var(
                vars,
                UPSTREAM_TIMEOUT_VAR,
                crate::http::DEFAULT_UPSTREAM_TIMEOUT.as_secs(),
            )?,
            backoff: BackoffPlan {
                max_attempts: parse_var(vars, MAX_ATTEMPTS_VAR, DEFAULT_MAX_ATTEMPTS)?,
                base_delay_ms: parse_var(vars, BASE_DELAY_VAR, DEFAULT_BASE_DELAY_MS)?,
            },
        };

        ConfigValidator::new().validate(&config)?;
        Ok(config)
    }
}

fn read_file(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    load_from_yaml_with(path, &ProcessEnv)
}

/// Load a YAML configuration, resolving `${VAR}` from `vars`
pub fn load_from_yaml_with<P: AsRef<Path>>(
    path: P,
    vars: &dyn VarSource,
) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let content = read_file(path)?;

    // Interpolate environment variables before parsing
    let interpolated = interpolate_env_vars(&content, vars)?;

    let config: RelayConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    load_from_json_with(path, &ProcessEnv)
}

/// Load a JSON configuration, resolving `${VAR}` from `vars`
pub fn load_from_json_with<P: AsRef<Path>>(
    path: P,
    vars: &dyn VarSource,
) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let content = read_file(path)?;

    let interpolated = interpolate_env_vars(&content, vars)?;

    let config: RelayConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = RelayConfig::from_vars(&vars(&[(API_KEY_VAR, "abc123")])).unwrap();
        assert_eq!(config.api_key.expose_secret(), "abc123");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.credential_mode, CredentialMode::Query);
        assert_eq!(config.backoff, BackoffPlan::default());
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = RelayConfig::from_vars(&vars(&[
            (API_KEY_VAR, "abc123"),
            (MODEL_VAR, "gemini-2.0-flash"),
            (CREDENTIAL_MODE_VAR, "header"),
            (MAX_ATTEMPTS_VAR, "3"),
            (BASE_DELAY_VAR, "3000"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.credential_mode, CredentialMode::Header);
        assert_eq!(config.backoff.max_attempts, 3);
        assert_eq!(config.backoff.base_delay_ms, 3000);
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = RelayConfig::from_vars(&vars(&[(MODEL_VAR, "gemini-2.0-flash")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = RelayConfig::from_vars(&vars(&[(API_KEY_VAR, "k"), (MAX_ATTEMPTS_VAR, "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::BadVariable { ref var, .. } if var == MAX_ATTEMPTS_VAR));
    }

    #[test]
    fn test_oversized_timeout_is_rejected() {
        let err = RelayConfig::from_vars(&vars(&[
            (API_KEY_VAR, "k"),
            (UPSTREAM_TIMEOUT_VAR, "9223372036854775807"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_valid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.yaml");
        fs::write(
            &path,
            r#"
api_key: ${GEMINI_API_KEY}
model: gemini-2.0-flash
credential_mode: header
backoff:
  max_attempts: 3
"#,
        )
        .unwrap();

        let config = load_from_yaml_with(&path, &vars(&[(API_KEY_VAR, "from-env")])).unwrap();
        assert_eq!(config.api_key.expose_secret(), "from-env");
        assert_eq!(config.credential_mode, CredentialMode::Header);
        assert_eq!(config.backoff.max_attempts, 3);
        assert_eq!(config.backoff.base_delay_ms, DEFAULT_BASE_DELAY_MS);
    }

    #[test]
    fn test_load_json_unknown_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        fs::write(&path, r#"{ "api_key": "k", "provider": "openai" }"#).unwrap();

        let err = load_from_json_with(&path, &vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_from_json("/nonexistent/relay.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
