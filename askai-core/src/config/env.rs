//! Environment variable lookup and interpolation for configuration

use super::error::ConfigError;
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

/// Source of variable values. The process environment in production, a map in tests.
pub trait VarSource {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads from `std::env`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<F> VarSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
    })
}

/// Interpolate `${VAR}` references in a configuration string
pub fn interpolate_env_vars(content: &str, vars: &dyn VarSource) -> Result<String, ConfigError> {
    let mut result = content.to_string();

    for cap in env_var_pattern().captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];

        match vars.get(var_name) {
            Some(value) => {
                result = result.replace(full_match, &value);
            }
            None => {
                return Err(ConfigError::UnsetVariable {
                    var: var_name.to_string(),
                });
            }
        }
    }

    Ok(result)
}

/// Read a variable, treating blank values as unset
pub fn read_var(vars: &dyn VarSource, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable, falling back to `default` when unset
pub fn parse_var<T>(vars: &dyn VarSource, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match read_var(vars, name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::BadVariable {
            var: name.to_string(),
            value: raw.clone(),
            message: e.to_string(),
        }),
    }
}
