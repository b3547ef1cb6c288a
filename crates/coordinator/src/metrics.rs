//! Coordinator-specific Prometheus metrics (C11), in the
//! `#[derive(MetricStorage)]` idiom used elsewhere in this workspace's
//! `autopilot`/`cow-amm` crates against `observe::metrics::get_storage_registry()`.

use {prometheus_metric_storage::MetricStorage, std::sync::OnceLock};

#[derive(MetricStorage)]
pub struct Metrics {
    /// Intent admission outcomes, labelled by result (`accepted`,
    /// `duplicate`, `invalid`, `invalid_signature`).
    #[metric(name = "coordinator_intents_admitted", labels("outcome"))]
    pub intents_admitted: prometheus::IntCounterVec,

    /// Bid submission outcomes, labelled by result (`accepted`,
    /// `superseded`, `rejected`, `invalid`, `invalid_signature`).
    #[metric(name = "coordinator_bids_submitted", labels("outcome"))]
    pub bids_submitted: prometheus::IntCounterVec,

    /// Wall-clock duration of an auction from admission to window close.
    #[metric(name = "coordinator_auction_duration_seconds")]
    pub auction_duration_seconds: prometheus::Histogram,

    /// Auctions closed, labelled by outcome (`selected`, `confirmed`,
    /// `expired_no_bids`). `selected` fires at window close when a winner is
    /// chosen; `confirmed` fires separately once the settler reports back.
    #[metric(name = "coordinator_auctions_closed", labels("outcome"))]
    pub auctions_closed: prometheus::IntCounterVec,

    /// Currently connected solver sessions.
    #[metric(name = "coordinator_solver_sessions_active")]
    pub solver_sessions_active: prometheus::IntGauge,

    /// Currently connected subscriber sessions.
    #[metric(name = "coordinator_subscriber_sessions_active")]
    pub subscriber_sessions_active: prometheus::IntGauge,

    /// Reaper sweeps completed, and how many intents each swept.
    #[metric(name = "coordinator_reaper_sweeps_total")]
    pub reaper_sweeps_total: prometheus::IntCounter,
    #[metric(name = "coordinator_reaper_intents_expired_total")]
    pub reaper_intents_expired_total: prometheus::IntCounter,
}

static METRICS: OnceLock<&'static Metrics> = OnceLock::new();

/// Returns the process-wide metrics instance, registering it on first call.
pub fn get() -> &'static Metrics {
    METRICS.get_or_init(|| Metrics::instance(observe::metrics::get_storage_registry()).expect("metrics registration cannot fail twice"))
}
