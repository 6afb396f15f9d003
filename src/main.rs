use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use fleetside::api::engine_routes;
use fleetside::clients::{Collaborators, PlatformClient};
use fleetside::config::{EngineConfig, HttpConfig};
use fleetside::engine::HostEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Internal API token is required; everything else has a fallback.
    let token = std::env::var("FLEETSIDE_PLATFORM_TOKEN").unwrap_or_else(|_| {
        eprintln!("Error: FLEETSIDE_PLATFORM_TOKEN not set");
        eprintln!("  export FLEETSIDE_PLATFORM_TOKEN=...");
        std::process::exit(1);
    });

    let bind_addr =
        std::env::var("FLEETSIDE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let upstream_base_url = std::env::var("FLEETSIDE_PLATFORM_URL")
        .unwrap_or_else(|_| "http://localhost:9000".to_string());

    let upstream_timeout_secs: u64 = std::env::var("FLEETSIDE_UPSTREAM_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10);

    let http_config = HttpConfig {
        bind_addr,
        upstream_base_url,
        upstream_timeout: Duration::from_secs(upstream_timeout_secs),
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %http_config.bind_addr,
        upstream = %http_config.upstream_base_url,
        "Starting fleetside"
    );

    let client = PlatformClient::new(&http_config, SecretString::from(token))?;
    let engine = Arc::new(HostEngine::new(
        EngineConfig::default(),
        Collaborators::from_platform(client),
    ));

    let router = engine_routes(engine.clone());
    let listener = tokio::net::TcpListener::bind(&http_config.bind_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            engine.shutdown().await;
        })
        .await?;

    Ok(())
}
