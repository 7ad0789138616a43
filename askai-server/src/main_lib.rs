use std::{sync::Arc, time::Duration};

use crate::config::Config;
use askai_core::{RelayConfig, RelayHandler};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub relay: RelayHandler,
    /// Upper bound on one `/ask-ai` relay run
    pub request_timeout: Duration,
}

pub fn init_tracing() {
    let log_format = std::env::var("ASKAI_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(relay_config: RelayConfig, config: &Config) -> anyhow::Result<Arc<AppState>> {
    let worst_case = relay_config.worst_case_duration();
    if worst_case > config.request_timeout {
        tracing::warn!(
            "Relay may run for {}s but requests time out after {}s; \
             lower ASKAI_MAX_ATTEMPTS or raise ASKAI_REQUEST_TIMEOUT_MS",
            worst_case.as_secs(),
            config.request_timeout.as_secs()
        );
    }

    tracing::info!(
        "Relaying to model {} ({} attempts, {}ms base delay, credential via {})",
        relay_config.model,
        relay_config.backoff.max_attempts,
        relay_config.backoff.base_delay_ms,
        relay_config.credential_mode
    );

    let relay = RelayHandler::from_config(relay_config)?;
    Ok(Arc::new(AppState {
        relay,
        request_timeout: config.request_timeout,
    }))
}
