// Phoenix gateway server
// Decision: Consumers run in-process and stop on the same Ctrl-C that drains HTTP

use std::sync::Arc;

use anyhow::{Context, Result};
use phoenix_anthropic::AnthropicGenerator;
use phoenix_core::telemetry::{init_telemetry, TelemetryConfig};
use phoenix_core::{ContentGenerator, EchoGenerator, EventStore, InMemoryEventStore};
use phoenix_gateway::config::{GatewayConfig, ProviderKind};
use phoenix_gateway::consumers::{join_consumers, spawn_consumers};
use phoenix_gateway::state::AppState;
use phoenix_gateway::build_app;
use phoenix_openai::OpenAiGenerator;
use phoenix_storage::PostgresEventStore;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut telemetry_config = TelemetryConfig::from_env();
    if telemetry_config.service_name == "phoenix" {
        telemetry_config = telemetry_config.with_service_name("phoenix-gateway");
    }
    if telemetry_config.log_filter.is_none() {
        telemetry_config.log_filter = Some("info,tower_http=debug".to_string());
    }
    init_telemetry(telemetry_config);

    let config = GatewayConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        storage = config.storage_backend(),
        auth_mode = config.auth.mode.as_str(),
        provider = ?config.provider,
        "phoenix-gateway starting..."
    );

    let store = connect_store(&config).await?;
    let generator = build_generator(config.provider)?;
    let state = AppState::new(store, generator, &config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumers = spawn_consumers(&state, &config, shutdown_rx);

    let app = build_app(state, &config);

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }
    if config.cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS origins configured");
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("HTTP server stopped, stopping consumers");
    shutdown_tx.send(true).ok();
    join_consumers(consumers).await;

    Ok(())
}

async fn connect_store(config: &GatewayConfig) -> Result<Arc<dyn EventStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresEventStore::connect(url, config.database_max_connections)
                .await
                .context("Failed to connect to database")?;
            store.migrate().await.context("Failed to run migrations")?;
            tracing::info!("Connected to database");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory event store (dev mode)");
            Ok(Arc::new(InMemoryEventStore::new()))
        }
    }
}

fn build_generator(kind: ProviderKind) -> Result<Arc<dyn ContentGenerator>> {
    let generator: Arc<dyn ContentGenerator> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiGenerator::from_env()?),
        ProviderKind::Anthropic => Arc::new(AnthropicGenerator::from_env()?),
        ProviderKind::Echo => {
            tracing::warn!("No AI provider configured, using echo generator");
            Arc::new(EchoGenerator)
        }
    };
    Ok(generator)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
