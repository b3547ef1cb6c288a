//! Off-chain intent-auction coordinator (§1). Binds the public HTTP/WS API
//! and a separate metrics listener, coordinates signed intents and bids
//! through to a `SelectWinningBid` publication for the settler.

mod api;
mod arguments;
mod config;
mod domain;
mod error;
mod infra;
mod metrics;
mod run;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = arguments::Arguments::parse();
    observe::logging::init(&args.log_filter);
    tracing::info!(%args, "starting coordinator");

    run::run(args).await
}
