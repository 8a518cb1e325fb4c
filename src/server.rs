//! HTTP Server and Metrics Collection
//!
//! This module implements the exporter's HTTP server and the kubelet polling loop.
//!
//! # Architecture
//!
//! - **HTTP Server**: Axum-based server exposing `/metrics`, `/health`, `/ready` and `/`
//! - **Collection Loop**: Background task polling the kubelet on a fixed interval
//! - **State Management**: `VolumeMetrics` and the client are shared via `Arc`
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to the other routes
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - Liveness, always 200 once the process is serving
//! - `GET /ready` - Readiness, 200 unless `ready_requires_successful_scrape` is
//!   set and no poll has succeeded yet
//!
//! # Collection Loop
//!
//! The first poll runs immediately; later polls follow `scrape_interval_seconds`.
//! Only one poll is ever in flight: a poll that overruns the interval delays the
//! next tick instead of overlapping it. The HTTP handlers never trigger a poll.
//!
//! # Shutdown
//!
//! SIGINT/SIGTERM cancel a shared [`CancellationToken`]. The loop stops (an
//! in-flight poll is abandoned) and the server drains open requests for at most
//! `shutdown_grace_period_seconds`.

use crate::collectors::{self, CollectionContext, CollectionStatus};
use crate::config::Config;
use crate::kubelet::KubeletClient;
use crate::metrics::VolumeMetrics;
use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub metrics: VolumeMetrics,
    pub ready_requires_successful_scrape: bool,
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down gracefully...");
        signal_token.cancel();
    });

    run(config, shutdown).await
}

/// Run the exporter until `shutdown` is cancelled
///
/// Fails only if the client cannot be built or the metrics port cannot be bound.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let metrics = VolumeMetrics::new()?;
    let client = Arc::new(
        KubeletClient::new(config.kubelet.clone()).context("Failed to build kubelet client")?,
    );

    let state = AppState {
        metrics: metrics.clone(),
        ready_requires_successful_scrape: config.server.ready_requires_successful_scrape,
    };
    let app = router(state);

    // Bind before polling so a taken port fails fast
    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", addr))?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    // Start background metrics collection
    let collection = tokio::spawn(collect_metrics_loop(
        client,
        metrics,
        config.metrics.scrape_interval(),
        shutdown.clone(),
    ));

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let mut server_task = tokio::spawn(async move { server.await });

    let served = tokio::select! {
        result = &mut server_task => Some(result),
        _ = shutdown.cancelled() => None,
    };

    let outcome = match served {
        // Server stopped on its own before any shutdown was requested
        Some(result) => {
            shutdown.cancel();
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("Metrics server failed")),
                Err(e) => Err(anyhow::Error::new(e).context("Metrics server task panicked")),
            }
        }
        None => {
            drain_server(server_task, config.server.shutdown_grace_period()).await;
            Ok(())
        }
    };

    if let Err(e) = collection.await {
        error!("Collection task failed: {}", e);
    }

    info!("Shutdown complete");
    outcome
}

async fn drain_server(
    server_task: tokio::task::JoinHandle<std::io::Result<()>>,
    grace_period: Duration,
) {
    let abort = server_task.abort_handle();
    match tokio::time::timeout(grace_period, server_task).await {
        Ok(Ok(Ok(()))) => debug!("Metrics server drained"),
        Ok(Ok(Err(e))) => error!("Error during server shutdown: {}", e),
        Ok(Err(e)) => error!("Metrics server task failed: {}", e),
        Err(_) => {
            warn!(
                "Metrics server did not drain within {:?}, closing remaining connections",
                grace_period
            );
            abort.abort();
        }
    }
}

/// Poll the kubelet until `shutdown` is cancelled
///
/// The first tick of a tokio interval fires immediately, which gives the eager
/// first collection.
pub async fn collect_metrics_loop(
    client: Arc<KubeletClient>,
    metrics: VolumeMetrics,
    scrape_interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(scrape_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctx = CollectionContext {
        client: &client,
        metrics: &metrics,
    };

    info!(
        "Polling {} every {:?}",
        client.summary_url(),
        scrape_interval
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Abandoning in-flight collection");
                break;
            }
            status = collectors::collect_volume_metrics(&ctx) => {
                if status == CollectionStatus::Failed {
                    debug!(
                        "Collection failed, {} errors so far",
                        metrics.scrape_errors_total.get()
                    );
                }
            }
        }
    }

    info!("Collection loop stopped");
}

/// Build the exporter's HTTP routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    axum::response::Html(
        r#"<html>
<head><title>Kubelet Volume Stats Exporter</title></head>
<body>
<h1>Kubelet Volume Stats Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
<p><a href="/ready">Ready</a></p>
</body>
</html>"#,
    )
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(metrics) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            metrics,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.ready_requires_successful_scrape && !state.metrics.has_successful_scrape() {
        (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
    } else {
        (StatusCode::OK, "Ready")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
