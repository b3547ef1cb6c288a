//! `/health` and `/metrics` endpoints (C11), served on a separate listener
//! from the public API so an operator can firewall it independently.

use {
    axum::{extract::State, routing::get, Router},
    std::{net::SocketAddr, sync::Arc},
};

/// Implemented by whatever component owns the definition of "the process is
/// making progress" — for the coordinator, the auction controller (no
/// auction has gone silent for longer than a configured threshold).
#[async_trait::async_trait]
pub trait LivenessChecking: Send + Sync {
    async fn is_alive(&self) -> bool;
}

/// Returns the global metric registry every `MetricStorage`-derived struct
/// registers itself into via `Metrics::instance(get_storage_registry())`.
pub fn get_storage_registry() -> &'static prometheus::Registry {
    prometheus_metric_storage::get_storage_registry()
}

async fn metrics_handler() -> String {
    use prometheus::Encoder as _;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = get_storage_registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).expect("metric encoding cannot fail");
    String::from_utf8(buffer).expect("prometheus text format is valid utf-8")
}

async fn health_handler<L: LivenessChecking + 'static>(
    State(liveness): State<Arc<L>>,
) -> axum::http::StatusCode {
    if liveness.is_alive().await {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Serves `/health` and `/metrics` on `addr` until the process exits. Spawned
/// as its own task; a failure here should not take down the main server.
pub async fn serve_metrics<L: LivenessChecking + 'static>(liveness: Arc<L>, addr: SocketAddr) {
    let app = Router::new()
        .route("/health", get(health_handler::<L>))
        .route("/metrics", get(metrics_handler))
        .with_state(liveness);

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!(%err, "metrics server stopped unexpectedly");
            }
        }
        Err(err) => tracing::error!(%err, %addr, "failed to bind metrics listener"),
    }
}
