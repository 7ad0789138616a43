use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub body_limit: usize,
}

/// Default JSON body limit (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(90_000),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Config {
    /// Read server settings from the environment, loading `.env` first
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let host = std::env::var("ASKAI_LISTEN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
        let listen_addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
        let cors_allow = std::env::var("ASKAI_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("ASKAI_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "90000".into())
            .parse()
            .unwrap_or(90_000);
        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            body_limit: DEFAULT_BODY_LIMIT,
        })
    }
}
