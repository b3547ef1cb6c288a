//! Shared application state handed to every axum handler (§6). Everything
//! here is already `Clone`-cheap (`Arc`/`PgPool`/`moka::Cache` internals),
//! so `AppState` itself derives `Clone` rather than wrapping itself in an
//! `Arc` a second time.

use {
    crate::domain::{admission::AdmissionPipeline, auction::AuctionController, auth::AuthVerifier},
    bus::{cache::IntentCache, MessageBus},
    configs::CoordinatorConfig,
    sqlx::PgPool,
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: IntentCache,
    pub admission: Arc<AdmissionPipeline>,
    pub auction: Arc<AuctionController>,
    pub bus: Arc<dyn MessageBus>,
    pub config: Arc<CoordinatorConfig>,
    pub solver_auth: AuthVerifier,
    pub subscriber_auth: AuthVerifier,
    pub session_queue_capacity: usize,
}
