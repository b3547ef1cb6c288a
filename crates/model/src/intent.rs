use {
    crate::{Address, Amount, Hash},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Lifecycle of an intent (§3). Terminal states never transition further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    New,
    Broadcasting,
    Bidding,
    Filled,
    Expired,
    Cancelled,
    Failed,
}

impl IntentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Expired | Self::Cancelled | Self::Failed)
    }

    /// Statuses in which a bid may still be accepted against the intent.
    pub fn accepts_bids(self) -> bool {
        matches!(self, Self::Broadcasting | Self::Bidding)
    }
}

/// The immutable, user-signed payload of an intent (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentPayload {
    pub token_in: Address,
    pub token_out: Address,
    #[serde(with = "crate::intent::amount_as_decimal_str")]
    pub amount_in: Amount,
    pub max_slippage_bps: u16,
    pub deadline: i64,
    pub chain_id: u64,
    pub receiver: Address,
    #[serde(with = "crate::intent::amount_as_decimal_str")]
    pub nonce: Amount,
}

/// The durable record: immutable payload plus mutable status/derived fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub intent_hash: Hash,
    pub payload: IntentPayload,
    pub signature: [u8; 65],
    pub signer: Address,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: IntentStatus,
    pub best_bid_id: Option<crate::bid::BidId>,
    pub total_bids: i32,
}

impl Intent {
    pub fn new(
        intent_hash: Hash,
        payload: IntentPayload,
        signature: [u8; 65],
        signer: Address,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = DateTime::from_timestamp(payload.deadline, 0).unwrap_or(now);
        Self {
            intent_hash,
            payload,
            signature,
            signer,
            created_at: now,
            updated_at: now,
            expires_at,
            status: IntentStatus::New,
            best_bid_id: None,
            total_bids: 0,
        }
    }
}

/// `amountIn`/`nonce` are 256-bit integers; the wire format is a decimal
/// string at the JSON boundary (§3) so clients never lose precision to a
/// JS-number round trip.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_round_trips_as_decimal_string() {
        let payload = IntentPayload {
            token_in: Address::ZERO,
            token_out: Address::ZERO,
            amount_in: Amount::from(1_000_000_000_000_000_000u128),
            max_slippage_bps: 300,
            deadline: 1_700_000_000,
            chain_id: 1,
            receiver: Address::ZERO,
            nonce: Amount::from(1u8),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["amountIn"], "1000000000000000000");
        let round_tripped: IntentPayload = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped, payload);
    }

    #[test]
    fn terminal_statuses_do_not_accept_bids() {
        for status in [
            IntentStatus::Filled,
            IntentStatus::Expired,
            IntentStatus::Cancelled,
            IntentStatus::Failed,
        ] {
            assert!(status.is_terminal());
            assert!(!status.accepts_bids());
        }
        assert!(IntentStatus::Broadcasting.accepts_bids());
        assert!(IntentStatus::Bidding.accepts_bids());
        assert!(!IntentStatus::New.accepts_bids());
    }
}
