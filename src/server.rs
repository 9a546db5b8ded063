//! HTTP Server
//!
//! Axum server exposing the metric sink to Prometheus.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - 200 if the last poll succeeded, 503 otherwise
//!
//! # Triggering
//!
//! In on-demand mode `/metrics` runs a poll cycle before rendering. A failed
//! connection answers 500; a failed read still answers 200 with the last
//! known-good values. In background mode a spawned task polls on a timer and
//! `/metrics` only renders.

use crate::bus::{Connector, ModbusConnector};
use crate::config::{Config, TriggerMode};
use crate::error::ExporterError;
use crate::metrics::MetricsCollector;
use crate::poller::Poller;
use crate::registers::RegisterMap;
use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

struct AppState<C: Connector> {
    poller: Arc<Poller<C>>,
    mode: TriggerMode,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            poller: self.poller.clone(),
            mode: self.mode,
        }
    }
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let registers = RegisterMap::standard(config.energy_scale()?);
    let metrics = MetricsCollector::new(&config.metrics.namespace, config.metrics.power_unit)?;
    let connector = ModbusConnector::from_config(&config.meter)?;
    let poller = Arc::new(Poller::new(connector, registers, metrics));

    if config.metrics.mode == TriggerMode::Background {
        // Fatal at startup; later reconnects are handled by the poll loop
        poller
            .connect()
            .await
            .context("Initial connection to power meter failed")?;

        let period = Duration::from_secs(config.metrics.poll_interval_seconds);
        tokio::spawn(poller.clone().run(period));
    }

    let app = router(poller, config.metrics.mode);

    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::Server(format!("failed to bind {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Metrics server stopped");
    Ok(())
}

/// Build the router for a poller.
pub fn router<C: Connector>(poller: Arc<Poller<C>>, mode: TriggerMode) -> Router {
    let state = AppState { poller, mode };

    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler::<C>))
        .route("/health", get(health_handler::<C>))
        .with_state(state)
}

/// Resolve on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

async fn root_handler() -> impl IntoResponse {
    axum::response::Html(
        r#"<html>
<head><title>Power Meter Exporter</title></head>
<body>
<h1>Power Meter Prometheus Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
    )
}

async fn metrics_handler<C: Connector>(State(state): State<AppState<C>>) -> Response {
    if state.mode == TriggerMode::OnDemand {
        if let Err(e) = state.poller.collect_on_demand().await {
            if e.is_connection() {
                error!("{}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Modbus connection failed")
                    .into_response();
            }
            warn!("{}; serving last known values", e);
        }
    }

    match state.poller.metrics().render() {
        Ok(metrics) => metrics.into_response(),
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

async fn health_handler<C: Connector>(State(state): State<AppState<C>>) -> impl IntoResponse {
    let up_value = state.poller.metrics().up.get();

    if up_value > 0.0 {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Power meter unreachable")
    }
}
