use {
    crate::{Address, Amount, Hash},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Identifies a bid within the scope of a single intent's auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidId(pub uuid::Uuid);

impl BidId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for BidId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a bid within an auction (§3). `Won`/`Lost`/`Expired`/`Invalid`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Won,
    Lost,
    Invalid,
}

impl BidStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Expired | Self::Won | Self::Lost | Self::Invalid
        )
    }
}

/// The immutable, solver-signed payload of a bid (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidPayload {
    pub intent_hash: Hash,
    #[serde(with = "amount_as_decimal_str")]
    pub quote_out: Amount,
    pub solver_fee_bps: u16,
    #[serde(with = "hex_bytes")]
    pub calldata_hint: Vec<u8>,
    pub ttl_ms: u32,
}

/// The durable record: immutable payload plus auction-derived state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub bid_id: BidId,
    pub payload: BidPayload,
    pub solver_signature: [u8; 65],
    pub solver_id: Address,
    pub arrived_at: DateTime<Utc>,
    /// Normalized score computed against the auction's max `quoteOut` (§4.6).
    /// `None` until the auction closes.
    pub score: Option<f64>,
    /// 1-based rank within its auction once scored, 1 being the winner.
    pub rank: Option<u32>,
    pub status: BidStatus,
}

impl Bid {
    pub fn new(payload: BidPayload, solver_signature: [u8; 65], solver_id: Address, arrived_at: DateTime<Utc>) -> Self {
        Self {
            bid_id: BidId::new(),
            payload,
            solver_signature,
            solver_id,
            arrived_at,
            score: None,
            rank: None,
            status: BidStatus::Pending,
        }
    }
}

/// `quoteOut` is a 256-bit integer encoded as a decimal string at the JSON
/// boundary, mirroring [`crate::intent`]'s `amountIn`/`nonce` codec.
mod amount_as_decimal_str {
    use {
        alloy_primitives::U256,
        serde::{de::Error, Deserialize, Deserializer, Serializer},
    };

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str_radix(&raw, 10).map_err(D::Error::custom)
    }
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("0x{}", const_hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        const_hex::decode(raw.trim_start_matches("0x")).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> BidPayload {
        BidPayload {
            intent_hash: Hash::ZERO,
            quote_out: Amount::from(42u8),
            solver_fee_bps: 10,
            calldata_hint: vec![0xde, 0xad, 0xbe, 0xef],
            ttl_ms: 2_000,
        }
    }

    #[test]
    fn calldata_hint_round_trips_as_hex_string() {
        let payload = sample_payload();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["calldataHint"], "0xdeadbeef");
        let round_tripped: BidPayload = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped, payload);
    }

    #[test]
    fn fresh_bid_starts_pending_and_unscored() {
        let bid = Bid::new(sample_payload(), [0u8; 65], Address::ZERO, Utc::now());
        assert_eq!(bid.status, BidStatus::Pending);
        assert!(bid.score.is_none());
        assert!(bid.rank.is_none());
        assert!(!bid.status.is_terminal());
    }

    #[test]
    fn bid_ids_are_unique() {
        assert_ne!(BidId::new(), BidId::new());
    }
}
