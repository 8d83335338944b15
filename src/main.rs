use std::sync::Arc;

use anyhow::Context;
use pit_strategy_api::{
    config::ServiceConfig, model::LinearModel, router, telemetry::openf1::OpenF1Provider,
    AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServiceConfig::from_env()?;

    // Train and persist before accepting connections, then serve what was written.
    let trained = LinearModel::train().context("failed to fit lap time model")?;
    trained.save(&cfg.model_path)?;
    let mdl = LinearModel::load(&cfg.model_path)?;
    tracing::info!(
        "model ready at {}: coef={:?} intercept={:.4}",
        cfg.model_path.display(),
        mdl.coefficients,
        mdl.intercept
    );

    let state = AppState {
        mdl: Arc::new(mdl),
        telemetry: Arc::new(OpenF1Provider::new(cfg.openf1_base_url.clone())),
    };
    tracing::info!("telemetry provider: {}", cfg.openf1_base_url);

    let app = router(state);

    tracing::info!("listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
