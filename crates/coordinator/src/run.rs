//! Process lifecycle (C13): construct every component in dependency order,
//! serve, and tear down in reverse on `SIGTERM`/`SIGINT` (§4.13).

use {
    crate::{
        api,
        arguments::Arguments,
        config::Settings,
        domain::{admission::AdmissionPipeline, auction::AuctionController, auth::AuthVerifier, locks::IntentLockRegistry, reaper::Reaper},
        infra::{liveness::ReaperLiveness, state::AppState},
    },
    bus::{cache::IntentCache, InProcessBus, MessageBus},
    sqlx::postgres::PgPoolOptions,
    std::sync::Arc,
};

pub async fn run(args: Arguments) -> anyhow::Result<()> {
    let settings = Settings::load(&args.config)?;
    let config = Arc::new(settings.auction);

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections.get())
        .connect(settings.database.write_url.as_str())
        .await?;
    database::run_migrations(&pool).await?;

    let cache = IntentCache::new(10_000);
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::new());
    let locks = IntentLockRegistry::new();

    let auction = Arc::new(AuctionController::new(pool.clone(), cache.clone(), bus.clone(), locks.clone(), config.clone()));
    let admission = Arc::new(AdmissionPipeline::new(pool.clone(), cache.clone(), bus.clone(), locks.clone(), config.clone(), auction.clone()));

    let liveness = Arc::new(ReaperLiveness::new(chrono::Duration::seconds(args.reaper_interval.as_secs() as i64 * 6)));
    let reaper = Reaper::new(pool.clone(), auction.clone(), args.reaper_batch_size, liveness.clone());
    let reaper_task = tokio::spawn(reaper.run(args.reaper_interval));

    let state = AppState {
        pool: pool.clone(),
        cache,
        admission,
        auction,
        bus,
        config,
        solver_auth: AuthVerifier::new(args.solver_auth_secret.clone().into_bytes(), "solver"),
        subscriber_auth: AuthVerifier::new(args.subscriber_auth_secret.clone().into_bytes(), "client"),
        session_queue_capacity: args.session_queue_capacity,
    };

    let metrics_task = tokio::spawn(observe::metrics::serve_metrics(liveness, args.metrics_address));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(args.bind_address).await?;
    tracing::info!(address = %args.bind_address, "coordinator listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    reaper_task.abort();
    metrics_task.abort();
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
