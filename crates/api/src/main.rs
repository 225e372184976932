use anyhow::Context as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pms_observability::init();

    let config = pms_api::ApiConfig::from_env()?;
    tracing::info!(config = ?config, "starting pms-api");

    let app = pms_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
