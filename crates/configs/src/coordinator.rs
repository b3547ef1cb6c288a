//! Auction-tuning knobs, loaded from a TOML file (`--config`) separately
//! from the operational flags in the coordinator binary's `Arguments`
//! (bind address, log level, secrets) — the same split the database pool's
//! [`crate::database::DatabasePoolConfig`] draws between "how to connect"
//! and "how the process should behave".

use {
    alloy_primitives::Address,
    std::{fmt::Debug, num::NonZeroU32, time::Duration},
};

const fn default_bidding_window_ms() -> u32 {
    3_000
}

const fn default_max_solver_fee_bps() -> u16 {
    30
}

const fn default_min_bid_count() -> u32 {
    1
}

const fn default_ws_heartbeat_interval() -> Duration {
    Duration::from_secs(15)
}

const fn default_ws_connection_timeout() -> Duration {
    Duration::from_secs(45)
}

fn default_api_rate_limit() -> NonZeroU32 {
    NonZeroU32::new(100).expect("value should be greater than 0")
}

#[derive(Clone, serde::Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Length of the bidding window after an intent is admitted (§4.6).
    #[serde(default = "default_bidding_window_ms")]
    pub bidding_window_ms: u32,

    /// Hard cap on `solverFeeBps` an accepted bid may carry (P8).
    #[serde(default = "default_max_solver_fee_bps")]
    pub max_solver_fee_bps: u16,

    /// Minimum number of accepted bids required for an auction to select a
    /// winner instead of expiring.
    #[serde(default = "default_min_bid_count")]
    pub min_bid_count: u32,

    /// Chain ID included in every EIP-712 domain this process signs or
    /// verifies against.
    pub chain_id: u64,

    /// The settlement contract address used as `verifyingContract` in both
    /// EIP-712 domains (§4.2, §4.6).
    pub settlement_contract: Address,

    /// JSON-RPC endpoint used to resolve solver on-chain reputation, if
    /// configured; purely informational otherwise (w_rep defaults to 0.5
    /// for unknown solvers regardless).
    pub rpc_url: Option<url::Url>,

    /// Interval between WebSocket ping frames sent to connected
    /// subscribers and solver sessions.
    #[serde(with = "humantime_serde", default = "default_ws_heartbeat_interval")]
    pub ws_heartbeat_interval: Duration,

    /// A connection with no pong and no traffic for this long is dropped.
    #[serde(with = "humantime_serde", default = "default_ws_connection_timeout")]
    pub ws_connection_timeout: Duration,

    /// Requests per second allowed per API key on the HTTP front door.
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: NonZeroU32,
}

impl Debug for CoordinatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorConfig")
            .field("bidding_window_ms", &self.bidding_window_ms)
            .field("max_solver_fee_bps", &self.max_solver_fee_bps)
            .field("min_bid_count", &self.min_bid_count)
            .field("chain_id", &self.chain_id)
            .field("settlement_contract", &self.settlement_contract)
            .field("rpc_url", &self.rpc_url.as_ref().map(|_| "REDACTED"))
            .field("ws_heartbeat_interval", &self.ws_heartbeat_interval)
            .field("ws_connection_timeout", &self.ws_connection_timeout)
            .field("api_rate_limit", &self.api_rate_limit)
            .finish()
    }
}

impl CoordinatorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let raw = r#"
chain-id = 1
settlement-contract = "0x0000000000000000000000000000000000000001"
"#;
        let config = CoordinatorConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.bidding_window_ms, 3_000);
        assert_eq!(config.max_solver_fee_bps, 30);
        assert_eq!(config.min_bid_count, 1);
        assert_eq!(config.chain_id, 1);
    }

    #[test]
    fn rejects_unknown_fields() {
        let raw = r#"
chain-id = 1
settlement-contract = "0x0000000000000000000000000000000000000001"
typo-field = true
"#;
        assert!(CoordinatorConfig::from_toml_str(raw).is_err());
    }
}
