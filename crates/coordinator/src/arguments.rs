//! Operational CLI flags (C10): bind addresses, log level, secrets. Domain
//! tuning knobs (bidding window, fee cap, EIP-712 domain) live in
//! `configs::CoordinatorConfig`, loaded separately from `--config` — the
//! same split drawn elsewhere in this workspace between `clap`-derived
//! per-binary `Arguments` and TOML-loaded `configs` structs.

use std::{net::SocketAddr, path::PathBuf};

#[derive(clap::Parser)]
pub struct Arguments {
    /// Address the public HTTP/WebSocket API binds to.
    #[clap(long, env, default_value = "0.0.0.0:8080")]
    pub bind_address: SocketAddr,

    /// Address `/health` and `/metrics` are served on, separate from the
    /// public API so an operator can firewall it independently.
    #[clap(long, env, default_value = "0.0.0.0:9090")]
    pub metrics_address: SocketAddr,

    /// `tracing_subscriber::EnvFilter` directive string, overridden by
    /// `RUST_LOG` when set.
    #[clap(long, env, default_value = "warn,coordinator=debug")]
    pub log_filter: String,

    /// Path to the TOML file holding `[auction]` (`CoordinatorConfig`) and
    /// `[database]` (`DatabasePoolConfig`) sections.
    #[clap(long, env)]
    pub config: PathBuf,

    /// HMAC-SHA256 secret used to verify solver session bearer tokens
    /// (audience `solver`). Tokens are issued out of process.
    #[clap(long, env)]
    pub solver_auth_secret: String,

    /// HMAC-SHA256 secret used to verify subscriber (client) bearer tokens
    /// (audience `client`/`websocket`).
    #[clap(long, env)]
    pub subscriber_auth_secret: String,

    /// Maximum number of intents the expiry reaper sweeps per tick (C9).
    #[clap(long, env, default_value = "500")]
    pub reaper_batch_size: u32,

    /// Interval between expiry reaper sweeps.
    #[clap(long, env, value_parser = humantime::parse_duration, default_value = "10s")]
    pub reaper_interval: std::time::Duration,

    /// Bounded outbound queue size per solver/subscriber session before the
    /// session is closed with `BackPressure` (§4.7).
    #[clap(long, env, default_value = "256")]
    pub session_queue_capacity: usize,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "bind_address: {}", self.bind_address)?;
        writeln!(f, "metrics_address: {}", self.metrics_address)?;
        writeln!(f, "log_filter: {}", self.log_filter)?;
        writeln!(f, "config: {}", self.config.display())?;
        writeln!(f, "solver_auth_secret: SECRET")?;
        writeln!(f, "subscriber_auth_secret: SECRET")?;
        writeln!(f, "reaper_batch_size: {}", self.reaper_batch_size)?;
        writeln!(f, "reaper_interval: {:?}", self.reaper_interval)?;
        writeln!(f, "session_queue_capacity: {}", self.session_queue_capacity)?;
        Ok(())
    }
}
