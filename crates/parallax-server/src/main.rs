//! Parallax service binary.
//!
//! Runs the HTTP API with in-memory adapters.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use parallax_server::{api, AppServices, ParallaxConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("parallax=info".parse()?))
        .init();

    info!("Parallax service starting");

    let config = ParallaxConfig::load().unwrap_or_else(|e| {
        info!(error = %e, "failed to load config, using defaults");
        ParallaxConfig::default()
    });

    info!(
        listen_addr = %config.server.listen_addr,
        workers = config.pipeline.workers,
        registry = %config.pipeline.registry_target,
        "configuration loaded"
    );

    let services = AppServices::in_memory(&config);
    services.orchestrator.start().await;

    let state = api::AppState {
        orchestrator: services.orchestrator.clone(),
        resolver: services.resolver,
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "listening");

    let serve = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
    });

    serve.await?;

    info!("shutting down worker pool");
    services.orchestrator.shutdown().await;

    Ok(())
}
