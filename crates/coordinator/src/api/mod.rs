pub mod http;
pub mod ws;

use {crate::infra::state::AppState, axum::Router};

/// Builds the full public-facing router (§6): REST under `/api`, WebSocket
/// upgrades under `/ws`, wrapped with the usual request-tracing layer.
pub fn router(state: AppState) -> Router {
    http::router(state.clone())
        .merge(ws::router(state))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
