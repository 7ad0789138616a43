//! Startup configuration errors

use thiserror::Error;

/// Why the relay configuration could not be built
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse '{path}' (line {}, column {}): {message}",
            .line.unwrap_or(0), .column.unwrap_or(0))]
    Parse {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("Invalid relay config: {0}")]
    Invalid(#[from] ValidationError),

    /// A `${VAR}` placeholder in a config file names an unset variable
    #[error("Config file references '{var}', which is not set")]
    UnsetVariable { var: String },

    /// The upstream credential is absent or blank
    #[error("{var} missing on server: set it in the environment or .env file")]
    MissingCredential { var: String },

    #[error("{var}={value:?} is not usable: {message}")]
    BadVariable {
        var: String,
        value: String,
        message: String,
    },

    #[error("Cannot build the upstream HTTP client: {message}")]
    Client { message: String },
}

/// A single rejected setting
#[derive(Debug, Error)]
#[error("{field} {kind}")]
pub struct ValidationError {
    /// Setting name as written in a config file, e.g. `backoff.max_attempts`
    pub field: &'static str,
    pub kind: ValidationErrorKind,
}

#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("must not be blank")]
    Blank,

    #[error("is malformed: {0}")]
    Malformed(String),

    #[error("is out of range: {0}")]
    OutOfRange(String),

    #[error("is not a usable URL: {0}")]
    BadUrl(String),
}

impl ValidationError {
    pub fn blank(field: &'static str) -> Self {
        Self {
            field,
            kind: ValidationErrorKind::Blank,
        }
    }

    pub fn malformed(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            kind: ValidationErrorKind::Malformed(message.into()),
        }
    }

    pub fn out_of_range(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            kind: ValidationErrorKind::OutOfRange(message.into()),
        }
    }

    pub fn bad_url(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            kind: ValidationErrorKind::BadUrl(message.into()),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
