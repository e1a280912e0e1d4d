use std::sync::Arc;

use anyhow::Context;
use curator_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    curator_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let (services, store) = curator_api::app::build_services(&config)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let app = curator_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
