//! Auction controller (C6) — the hard part. Owns the in-memory decision
//! of who leads a given intent's auction; stores remain the durable source
//! of truth, the cache and pub/sub are advisory (§3 Ownership).

use {
    crate::{domain::locks::IntentLockRegistry, metrics},
    bus::{cache::IntentCache, topics, MessageBus},
    chrono::Utc,
    configs::CoordinatorConfig,
    database::{bids, intents},
    model::{
        bid::{Bid, BidId, BidPayload, BidStatus},
        eip712::BidTypedData,
        Amount, ErrorKind, Hash, Intent, IntentStatus,
    },
    sqlx::PgPool,
    std::sync::Arc,
    winner_selection::{Candidate, ScoreInputs, ScoreWeights},
};

/// Response to a bid submission (§6's `POST /api/bids` success shape).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidResponse {
    pub accepted: bool,
    pub bid_id: BidId,
    pub rank: u32,
    pub score: f64,
}

pub struct AuctionController {
    pool: PgPool,
    cache: IntentCache,
    bus: Arc<dyn MessageBus>,
    locks: IntentLockRegistry,
    config: Arc<CoordinatorConfig>,
    weights: ScoreWeights,
}

impl AuctionController {
    pub fn new(
        pool: PgPool,
        cache: IntentCache,
        bus: Arc<dyn MessageBus>,
        locks: IntentLockRegistry,
        config: Arc<CoordinatorConfig>,
    ) -> Self {
        Self { pool, cache, bus, locks, config, weights: ScoreWeights::default() }
    }

    async fn load_intent(&self, intent_hash: &Hash) -> Result<Intent, ErrorKind> {
        if let Some(intent) = self.cache.get(intent_hash).await {
            return Ok((*intent).clone());
        }
        let mut conn = self.pool.acquire().await.map_err(storage_unavailable)?;
        intents::by_hash(&mut conn, intent_hash)
            .await
            .map_err(storage_unavailable)?
            .ok_or_else(|| ErrorKind::unknown_intent(display_hash(intent_hash)))
    }

    /// §4.6 `submit_bid`. Structural checks happen before the intent's lock
    /// is acquired; everything from "look up intent" onward is serialized
    /// per-intent.
    pub async fn submit_bid(&self, payload: BidPayload, signature: [u8; 65]) -> Result<BidResponse, ErrorKind> {
        if payload.quote_out.is_zero() {
            return Err(ErrorKind::invalid("quoteOut", "must be positive"));
        }
        if payload.solver_fee_bps > self.config.max_solver_fee_bps {
            return Err(ErrorKind::invalid(
                "solverFeeBps",
                format!("exceeds cap of {}", self.config.max_solver_fee_bps),
            ));
        }
        if !(1_000..=300_000).contains(&payload.ttl_ms) {
            return Err(ErrorKind::invalid("ttlMs", "must be between 1000 and 300000"));
        }
        if payload.calldata_hint.len() < 5 {
            return Err(ErrorKind::invalid("calldataHint", "must be at least 5 bytes"));
        }

        let intent = self.load_intent(&payload.intent_hash).await?;
        let now = Utc::now();
        if !intent.status.accepts_bids() {
            return Err(ErrorKind::intent_closed(display_hash(&payload.intent_hash)));
        }
        if intent.expires_at <= now {
            return Err(ErrorKind::intent_expired(display_hash(&payload.intent_hash)));
        }

        let typed_data = BidTypedData {
            intentHash: payload.intent_hash,
            quoteOut: payload.quote_out,
            solverFeeBps: payload.solver_fee_bps,
            calldataHint: payload.calldata_hint.clone().into(),
            ttlMs: payload.ttl_ms,
        };
        let (_, solver_id) = signature_validator::verify_bid(
            &typed_data,
            self.config.chain_id,
            self.config.settlement_contract,
            &signature,
        )
        .map_err(|_| ErrorKind::InvalidSignature)?;

        let guard = self.locks.acquire(payload.intent_hash).await;
        let result = self.admit_locked(&intent, payload, signature, solver_id, now).await;
        drop(guard);
        result
    }

    /// Everything from the single-solver-replacement rule through
    /// publication, run while holding the intent's lock. Only the final
    /// publish happens after the lock (not the case here — the lock guard
    /// is dropped by the caller right after this returns, and publication
    /// below is pure in-memory `tokio::sync::broadcast` send, not a
    /// suspending I/O call worth deferring further).
    async fn admit_locked(
        &self,
        intent: &Intent,
        payload: BidPayload,
        signature: [u8; 65],
        solver_id: alloy_primitives::Address,
        now: chrono::DateTime<Utc>,
    ) -> Result<BidResponse, ErrorKind> {
        let mut tx = self.pool.begin().await.map_err(storage_unavailable)?;

        let existing = bids::by_intent(&mut tx, &payload.intent_hash).await.map_err(storage_unavailable)?;

        // `BIDDING` alone doesn't mean the window is still open: once
        // `close_window_locked` has picked a winner the intent stays
        // `BIDDING` until settlement is confirmed (§4.6), but a `WON` bid
        // already on record means selection already happened. Admitting
        // (and re-ranking in) a later bid here would silently move
        // `best_bid_id` off the bid the settler may already be executing.
        if existing.iter().any(|bid| bid.status == BidStatus::Won) {
            metrics::get().bids_submitted.with_label_values(&["rejected"]).inc();
            return Err(ErrorKind::intent_closed(display_hash(&payload.intent_hash)));
        }

        let prior_own_bid = existing.iter().find(|bid| bid.solver_id == solver_id && bid.status == BidStatus::Accepted).cloned();

        let mut bid = Bid::new(payload.clone(), signature, solver_id, now);
        bid.status = BidStatus::Accepted;

        if let Some(prior) = &prior_own_bid {
            bids::update_status(&mut tx, prior.bid_id, BidStatus::Lost).await.map_err(storage_unavailable)?;
        }

        let window_ms = self.config.bidding_window_ms as u64;
        let arrived_ms_into_window = (now - intent.created_at).num_milliseconds().max(0) as u64;
        let mut accepted: Vec<Bid> = existing
            .into_iter()
            .filter(|candidate| candidate.status == BidStatus::Accepted && Some(candidate.bid_id) != prior_own_bid.as_ref().map(|b| b.bid_id))
            .collect();
        accepted.push(bid.clone());

        let auction_max_quote_out =
            accepted.iter().map(|candidate| amount_to_f64(candidate.payload.quote_out)).fold(0.0_f64, f64::max);

        let candidates: Vec<Candidate> = accepted
            .iter()
            .map(|candidate| {
                let inputs = ScoreInputs {
                    quote_out: amount_to_f64(candidate.payload.quote_out),
                    solver_fee_bps: candidate.payload.solver_fee_bps,
                    fee_cap_bps: self.config.max_solver_fee_bps,
                    arrived_ms_into_window: if candidate.bid_id == bid.bid_id {
                        arrived_ms_into_window
                    } else {
                        (candidate.arrived_at - intent.created_at).num_milliseconds().max(0) as u64
                    },
                    window_ms,
                    // Cold-start default; no historical win-rate feedback loop (see DESIGN.md).
                    solver_reputation: 0.5,
                };
                Candidate {
                    bid_id: candidate.bid_id,
                    arrived_at: candidate.arrived_at,
                    score: winner_selection::score(&inputs, auction_max_quote_out, &self.weights),
                }
            })
            .collect();

        let ranked = winner_selection::rank(candidates);

        bid.score = ranked.iter().find(|c| c.bid_id == bid.bid_id).map(|c| c.score);
        bid.rank = ranked.iter().find(|c| c.bid_id == bid.bid_id).map(|c| c.rank);
        let winner = ranked.iter().find(|candidate| candidate.rank == 1).expect("at least this bid is in the ranking");

        // Every candidate here is still `Accepted` — win/loss is decided at
        // window close (§4.6), not on each incoming bid. The new bid's own
        // score/rank goes in with its INSERT below, so only re-stamp the
        // others.
        for ranked_candidate in ranked.iter().filter(|candidate| candidate.bid_id != bid.bid_id) {
            bids::set_score_and_rank(
                &mut tx,
                ranked_candidate.bid_id,
                ranked_candidate.score,
                ranked_candidate.rank,
                BidStatus::Accepted,
            )
            .await
            .map_err(storage_unavailable)?;
        }

        bids::insert(&mut tx, &bid).await.map_err(storage_unavailable)?;
        intents::update_best_bid(&mut tx, &payload.intent_hash, winner.bid_id).await.map_err(storage_unavailable)?;
        if intent.status == IntentStatus::Broadcasting {
            intents::update_status(&mut tx, &payload.intent_hash, IntentStatus::Bidding, now).await.map_err(storage_unavailable)?;
        }

        tx.commit().await.map_err(storage_unavailable)?;

        self.cache.invalidate(&payload.intent_hash).await;

        let total_bids = intent.total_bids + 1;
        // Every accepted bid publishes `BidReceived`; only the bid that
        // actually takes the lead also gets a `BestBidUpdated` publish on the
        // same topic (§4.6 step 7, §6). A bid landing at rank > 1 must never
        // be mistaken for the leader by a subscriber (P4).
        let mut bid_update_payload = serde_json::json!({
            "messageType": "BidReceived",
            "intentHash": display_hash(&payload.intent_hash),
            "bidId": bid.bid_id,
            "rank": bid.rank,
            "score": bid.score,
            "quoteOut": bid.payload.quote_out.to_string(),
            "solverFeeBps": bid.payload.solver_fee_bps,
            "totalBids": total_bids,
        });
        let topic = topics::ws_bid_update(&display_hash(&payload.intent_hash));
        self.bus.publish(&topic, bid_update_payload.clone());
        if bid.rank == Some(1) {
            bid_update_payload["messageType"] = serde_json::Value::String("BestBidUpdated".to_owned());
            self.bus.publish(&topic, bid_update_payload);
        }

        metrics::get().bids_submitted.with_label_values(&["accepted"]).inc();

        Ok(BidResponse {
            accepted: true,
            bid_id: bid.bid_id,
            rank: bid.rank.unwrap_or(1),
            score: bid.score.unwrap_or(0.0),
        })
    }

    /// §4.6 window close. Idempotent against a racing deadline: a timer
    /// firing after the auction already closed finds a terminal-or-absent
    /// intent and is a no-op (§5 Cancellation).
    pub async fn close_window(&self, intent_hash: Hash) {
        let guard = self.locks.acquire(intent_hash).await;
        if let Err(err) = self.close_window_locked(intent_hash).await {
            tracing::warn!(%err, intent_hash = %display_hash(&intent_hash), "window close failed");
        }
        drop(guard);
        self.locks.forget(&intent_hash);
    }

    async fn close_window_locked(&self, intent_hash: Hash) -> Result<(), ErrorKind> {
        let mut conn = self.pool.acquire().await.map_err(storage_unavailable)?;
        let intent = match intents::by_hash(&mut conn, &intent_hash).await.map_err(storage_unavailable)? {
            Some(intent) if !intent.status.is_terminal() => intent,
            _ => return Ok(()),
        };

        let all_bids = bids::by_intent(&mut conn, &intent_hash).await.map_err(storage_unavailable)?;
        let mut accepted: Vec<Bid> = all_bids.into_iter().filter(|bid| bid.status == BidStatus::Accepted).collect();
        accepted.sort_by_key(|bid| bid.rank.unwrap_or(u32::MAX));

        let now = Utc::now();
        let duration_secs = (now - intent.created_at).num_milliseconds().max(0) as f64 / 1_000.0;
        metrics::get().auction_duration_seconds.observe(duration_secs);
        let mut final_status = intent.status;
        if accepted.len() as u32 >= self.config.min_bid_count {
            let winner = accepted.remove(0);
            bids::update_status(&mut conn, winner.bid_id, BidStatus::Won).await.map_err(storage_unavailable)?;
            for loser in &accepted {
                bids::update_status(&mut conn, loser.bid_id, BidStatus::Lost).await.map_err(storage_unavailable)?;
            }
            // Selection alone never makes the intent terminal: `best_bid_id`
            // is already pinned to `winner.bid_id` from admission, and the
            // intent stays `BIDDING` until `confirm_settlement` reports the
            // winning bid actually settled on-chain. If the settler never
            // reports, the expiry reaper's `expires_at` sweep is the
            // fallback that eventually closes it out (§4.6, §4.9).
            self.bus.publish(
                topics::COORDINATOR_BID_SELECTION,
                serde_json::json!({
                    "intentHash": display_hash(&intent_hash),
                    "bidId": winner.bid_id,
                    "quoteOut": winner.payload.quote_out.to_string(),
                    "solverFeeBps": winner.payload.solver_fee_bps,
                    "calldataHint": format!("0x{}", const_hex::encode(&winner.payload.calldata_hint)),
                    "solverId": winner.solver_id,
                    "timestamp": now,
                }),
            );
            metrics::get().auctions_closed.with_label_values(&["selected"]).inc();
        } else {
            for bid in &accepted {
                bids::update_status(&mut conn, bid.bid_id, BidStatus::Expired).await.map_err(storage_unavailable)?;
            }
            intents::update_status(&mut conn, &intent_hash, IntentStatus::Expired, now).await.map_err(storage_unavailable)?;
            self.cache.invalidate(&intent_hash).await;
            final_status = IntentStatus::Expired;
            metrics::get().auctions_closed.with_label_values(&["expired_no_bids"]).inc();
        }

        self.bus.publish(
            &topics::ws_intent_status(&display_hash(&intent_hash)),
            serde_json::json!({"intentHash": display_hash(&intent_hash), "status": final_status, "updatedAt": now}),
        );
        Ok(())
    }

    /// External settlement confirmation: the settler reports back once it
    /// has actually executed the pinned winning bid on-chain. This is the
    /// only path that makes an intent terminal at `FILLED` — window close
    /// only selects a winner and leaves the intent `BIDDING` with the
    /// winner pinned in `best_bid_id` (§4.6). Idempotent against a
    /// terminal intent (already confirmed, or already swept by the expiry
    /// reaper) and rejects a `bidId` that doesn't match the pinned winner.
    pub async fn confirm_settlement(&self, intent_hash: Hash, bid_id: BidId) -> Result<(), ErrorKind> {
        let guard = self.locks.acquire(intent_hash).await;
        let result = self.confirm_settlement_locked(intent_hash, bid_id).await;
        drop(guard);
        if result.is_ok() {
            self.locks.forget(&intent_hash);
        }
        result
    }

    async fn confirm_settlement_locked(&self, intent_hash: Hash, bid_id: BidId) -> Result<(), ErrorKind> {
        let mut conn = self.pool.acquire().await.map_err(storage_unavailable)?;
        let intent = intents::by_hash(&mut conn, &intent_hash)
            .await
            .map_err(storage_unavailable)?
            .ok_or_else(|| ErrorKind::unknown_intent(display_hash(&intent_hash)))?;

        if intent.status.is_terminal() {
            return Ok(());
        }
        if intent.best_bid_id != Some(bid_id) {
            return Err(ErrorKind::StateConflict(format!(
                "bid {bid_id} is not the pinned winner for intent {}",
                display_hash(&intent_hash)
            )));
        }

        let now = Utc::now();
        intents::update_status(&mut conn, &intent_hash, IntentStatus::Filled, now).await.map_err(storage_unavailable)?;
        self.cache.invalidate(&intent_hash).await;

        self.bus.publish(
            &topics::ws_intent_status(&display_hash(&intent_hash)),
            serde_json::json!({"intentHash": display_hash(&intent_hash), "status": IntentStatus::Filled, "updatedAt": now}),
        );
        metrics::get().auctions_closed.with_label_values(&["confirmed"]).inc();
        Ok(())
    }
}

fn amount_to_f64(amount: Amount) -> f64 {
    amount.to_string().parse().unwrap_or(f64::MAX)
}

fn display_hash(hash: &Hash) -> String {
    format!("0x{}", const_hex::encode(hash.as_slice()))
}

fn storage_unavailable(err: sqlx::Error) -> ErrorKind {
    ErrorKind::StorageUnavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_to_f64_parses_decimal_strings() {
        assert_eq!(amount_to_f64(Amount::from(42u8)), 42.0);
    }
}
