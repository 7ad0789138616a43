use askai_core::RelayConfig;
use askai_server::{api::app_router, build_state, config::Config, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let relay_config = match std::env::var("ASKAI_CONFIG_FILE") {
        Ok(path) if path.ends_with(".json") => askai_core::config::load_from_json(&path)?,
        Ok(path) => askai_core::config::load_from_yaml(&path)?,
        Err(_) => RelayConfig::from_env()?,
    };
    let state = build_state(relay_config, &config)?;

    let router = app_router(state, &config);
    tracing::info!("Server running on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
