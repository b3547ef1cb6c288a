//! The error taxonomy every component returns (§7).
//!
//! Components propagate a [`ErrorKind`]; only the HTTP boundary flattens it
//! into the `{status, message, code, timestamp}` wire envelope. Nothing
//! upstream of that boundary should construct the envelope directly.

use serde::Serialize;

/// A single offending field, reported on `InvalidInput`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub message: String,
}

impl Field {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Typed error kinds, one per §7 category. Each component recovers what it
/// can locally (storage retries, bounded pub/sub re-queues); what's left
/// propagates up as one of these.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("invalid input: {0:?}")]
    InvalidInput(Vec<Field>),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("duplicate intent {intent_hash}")]
    Duplicate { intent_hash: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("rate limited")]
    RateLimited,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("back pressure")]
    BackPressure,

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ErrorKind {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput(vec![Field::new(field, message)])
    }

    /// An intent unknown to the coordinator, or closed/expired against a bid
    /// submission (§4.6's `UnknownIntent`/`IntentClosed`/`IntentExpired`
    /// rejection reasons all surface as a 404/409 with the reason in `0`).
    pub fn unknown_intent(intent_hash: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("unknown intent {intent_hash}"))
    }

    pub fn intent_closed(intent_hash: impl std::fmt::Display) -> Self {
        Self::StateConflict(format!("intent {intent_hash} is no longer accepting bids"))
    }

    pub fn intent_expired(intent_hash: impl std::fmt::Display) -> Self {
        Self::StateConflict(format!("intent {intent_hash} has expired"))
    }

    /// HTTP status code this kind maps onto (§6).
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::InvalidSignature => 401,
            Self::NotFound(_) => 404,
            Self::Duplicate { .. } => 409,
            Self::StateConflict(_) => 409,
            Self::RateLimited => 429,
            Self::StorageUnavailable(_) => 503,
            Self::BackPressure => 503,
            Self::Timeout(_) => 504,
            Self::Internal(_) => 500,
        }
    }

    /// Machine-readable code carried in the wire envelope's `code` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidSignature => "invalid_signature",
            Self::NotFound(_) => "not_found",
            Self::Duplicate { .. } => "duplicate",
            Self::StateConflict(_) => "state_conflict",
            Self::RateLimited => "rate_limited",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::BackPressure => "back_pressure",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

// `anyhow` is only used to box opaque internal-invariant failures; every
// other variant is plain data so callers can match on it without downcasting.
