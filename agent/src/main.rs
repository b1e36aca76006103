//! Experiment agent server.
//!
//! Serves `POST /v1/track` for every configured SDK key. Each key gets its
//! own queueing client whose dispatcher logs delivered batches.
//!
//! Run with: `cargo run --bin experiment-agent`
//! Track: `POST http://localhost:8080/v1/track?eventKey=<key>`
//! Metrics: `http://localhost:9090/metrics`

mod config;

use anyhow::Context;
use axum::{Router, routing::get};
use config::AgentConfig;
use experiment_agent_core::{ExperimentClient, KeyedClientProvider, LogSink, QueueingClient};
use experiment_agent_web::{AppState, build_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = AgentConfig::from_env().context("failed to load configuration")?;
    info!(
        sdk_keys = config.sdk_keys.len(),
        event_keys = config.event_keys.len(),
        batch_size = config.batch_size,
        "starting experiment agent"
    );

    let metrics_handle = spawn_metrics_server(&config).await?;

    let (provider, dispatchers) = build_provider(&config);
    let app = build_router(AppState::new(Arc::new(provider)));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "HTTP server listening");

    // The router owns every client; once serve returns they are dropped and
    // the queues close.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("waiting for event dispatchers to drain");
    let drained = tokio::time::timeout(config.shutdown_timeout, join_dispatchers(dispatchers)).await;
    if drained.is_err() {
        warn!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            "dispatchers did not drain before the shutdown timeout"
        );
    }

    if let Some(handle) = metrics_handle {
        handle.abort();
    }

    info!("shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,experiment_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// One queueing client per SDK key; the first key serves requests without
/// an `X-SDK-Key` header.
fn build_provider(config: &AgentConfig) -> (KeyedClientProvider, Vec<JoinHandle<()>>) {
    let mut provider = KeyedClientProvider::new();
    let mut dispatchers = Vec::with_capacity(config.sdk_keys.len());

    for sdk_key in &config.sdk_keys {
        let (client, dispatcher) = QueueingClient::new(config.queue_config(), Arc::new(LogSink));
        let client: Arc<dyn ExperimentClient> = Arc::new(client);
        provider = provider.with_client(sdk_key.clone(), client);
        dispatchers.push(tokio::spawn(dispatcher.run()));
    }

    if let Some(first) = config.sdk_keys.first() {
        provider = provider.with_default_key(first.clone());
    }

    (provider, dispatchers)
}

async fn spawn_metrics_server(config: &AgentConfig) -> anyhow::Result<Option<JoinHandle<()>>> {
    let Some(addr) = config.metrics_addr()? else {
        info!("Prometheus exporter disabled");
        return Ok(None);
    };

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let app = Router::new().route("/metrics", get(move || async move { handle.render() }));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {addr}"))?;
    info!(%addr, "Prometheus metrics available at /metrics");

    Ok(Some(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "metrics server error");
        }
    })))
}

async fn join_dispatchers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "event dispatcher task failed");
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "unable to listen for shutdown signal"),
    }
}
