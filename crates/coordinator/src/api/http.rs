//! REST surface (§6). Signatures travel over the wire as `0x`-prefixed hex;
//! every other field reuses `model`'s own `Deserialize` impls directly so
//! the wire shape matches the EIP-712 payload field-for-field.

use {
    crate::{error::ApiError, infra::state::AppState},
    axum::{
        extract::{Path, State},
        routing::{get, post},
        Json, Router,
    },
    model::{bid::{BidId, BidPayload}, intent::IntentPayload, ErrorKind, Hash},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/intents", post(submit_intent))
        .route("/api/intents/{hash}", get(get_intent))
        .route("/api/intents/{hash}/status", get(get_intent_status))
        .route("/api/intents/{hash}/best-bid", get(get_best_bid))
        .route("/api/intents/{hash}/settlement", post(confirm_settlement))
        .route("/api/bids", post(submit_bid))
        .with_state(state)
}

fn decode_signature(hex_str: &str) -> Result<[u8; 65], ErrorKind> {
    let bytes = const_hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|_| ErrorKind::invalid("signature", "not valid hex"))?;
    bytes.try_into().map_err(|_| ErrorKind::invalid("signature", "must be 65 bytes"))
}

fn parse_hash(hash_str: &str) -> Result<Hash, ErrorKind> {
    hash_str.parse().map_err(|_| ErrorKind::invalid("hash", "not a valid 32-byte hex hash"))
}

#[derive(serde::Deserialize)]
struct IntentSubmission {
    #[serde(flatten)]
    payload: IntentPayload,
    signature: String,
}

async fn submit_intent(
    State(state): State<AppState>,
    Json(body): Json<IntentSubmission>,
) -> Result<(axum::http::StatusCode, Json<serde_json::Value>), ApiError> {
    let signature = decode_signature(&body.signature)?;
    let outcome = state.admission.submit(body.payload, signature).await?;
    let (status, response) = match outcome {
        crate::domain::admission::IntentSubmissionOutcome::Created(response) => {
            (axum::http::StatusCode::CREATED, response)
        }
        crate::domain::admission::IntentSubmissionOutcome::Duplicate(response) => {
            (axum::http::StatusCode::CONFLICT, response)
        }
    };
    Ok((status, Json(serde_json::to_value(response).expect("response serializes"))))
}

#[derive(serde::Deserialize)]
struct BidSubmission {
    #[serde(flatten)]
    payload: BidPayload,
    signature: String,
}

async fn submit_bid(
    State(state): State<AppState>,
    Json(body): Json<BidSubmission>,
) -> Result<Json<crate::domain::auction::BidResponse>, ApiError> {
    let signature = decode_signature(&body.signature)?;
    let response = state.auction.submit_bid(body.payload, signature).await?;
    Ok(Json(response))
}

async fn get_intent(State(state): State<AppState>, Path(hash): Path<String>) -> Result<Json<model::Intent>, ApiError> {
    let intent_hash = parse_hash(&hash)?;
    if let Some(intent) = state.cache.get(&intent_hash).await {
        return Ok(Json((*intent).clone()));
    }
    let mut conn = state.pool.acquire().await.map_err(|err| ErrorKind::StorageUnavailable(err.to_string()))?;
    let intent = database::intents::by_hash(&mut conn, &database_hash(intent_hash))
        .await
        .map_err(|err| ErrorKind::StorageUnavailable(err.to_string()))?
        .ok_or_else(|| ErrorKind::unknown_intent(hash))?;
    Ok(Json(intent))
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct IntentStatusResponse {
    status: model::IntentStatus,
    updated_at: chrono::DateTime<chrono::Utc>,
}

async fn get_intent_status(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<IntentStatusResponse>, ApiError> {
    let intent_hash = parse_hash(&hash)?;
    let mut conn = state.pool.acquire().await.map_err(|err| ErrorKind::StorageUnavailable(err.to_string()))?;
    let intent = database::intents::by_hash(&mut conn, &database_hash(intent_hash))
        .await
        .map_err(|err| ErrorKind::StorageUnavailable(err.to_string()))?
        .ok_or_else(|| ErrorKind::unknown_intent(hash))?;
    Ok(Json(IntentStatusResponse { status: intent.status, updated_at: intent.updated_at }))
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct BestBidResponse {
    bid: Option<model::Bid>,
    total_bids: i32,
    window_closes_at: chrono::DateTime<chrono::Utc>,
}

async fn get_best_bid(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<BestBidResponse>, ApiError> {
    let intent_hash = parse_hash(&hash)?;
    let mut conn = state.pool.acquire().await.map_err(|err| ErrorKind::StorageUnavailable(err.to_string()))?;
    let intent = database::intents::by_hash(&mut conn, &database_hash(intent_hash))
        .await
        .map_err(|err| ErrorKind::StorageUnavailable(err.to_string()))?
        .ok_or_else(|| ErrorKind::unknown_intent(hash))?;

    let bid = match intent.best_bid_id {
        Some(best_bid_id) => {
            let bids = database::bids::by_intent(&mut conn, &database_hash(intent_hash))
                .await
                .map_err(|err| ErrorKind::StorageUnavailable(err.to_string()))?;
            bids.into_iter().find(|bid| bid.bid_id == best_bid_id)
        }
        None => None,
    };

    let window_closes_at =
        intent.created_at + chrono::Duration::milliseconds(state.config.bidding_window_ms as i64);
    Ok(Json(BestBidResponse { bid, total_bids: intent.total_bids, window_closes_at }))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettlementConfirmation {
    bid_id: BidId,
}

/// The external settler reports back once it has executed the pinned
/// winning bid on-chain; only this call moves the intent to `FILLED`
/// (§4.6). Not part of the settler implementation itself, which stays out
/// of scope — only the coordinator-side confirmation entrypoint is.
async fn confirm_settlement(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Json(body): Json<SettlementConfirmation>,
) -> Result<axum::http::StatusCode, ApiError> {
    let intent_hash = parse_hash(&hash)?;
    state.auction.confirm_settlement(intent_hash, body.bid_id).await?;
    Ok(axum::http::StatusCode::OK)
}

fn database_hash(hash: Hash) -> database::Hash {
    database::byte_array::ByteArray(hash.0)
}
