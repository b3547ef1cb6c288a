//! Intent admission pipeline (C5): validate, dedupe, verify, persist,
//! publish, arm the window timer. Steps 2–8 are serialized per `intentHash`
//! via the same lock registry the auction controller uses, so concurrent
//! duplicate submissions never race each other (§4.5 Fairness).

use {
    crate::{domain::{auction::AuctionController, locks::IntentLockRegistry}, metrics},
    bus::{cache::IntentCache, topics, MessageBus},
    chrono::Utc,
    configs::CoordinatorConfig,
    database::intents,
    model::{
        eip712::IntentTypedData, intent::IntentPayload, Amount, ErrorKind, Hash, Intent, IntentStatus,
    },
    sqlx::PgPool,
    std::sync::Arc,
};

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentSubmissionResponse {
    pub intent_hash: String,
    pub bidding_window_ms: u32,
    pub expires_at: chrono::DateTime<Utc>,
    pub status: &'static str,
}

pub enum IntentSubmissionOutcome {
    Created(IntentSubmissionResponse),
    Duplicate(IntentSubmissionResponse),
}

pub struct AdmissionPipeline {
    pool: PgPool,
    cache: IntentCache,
    bus: Arc<dyn MessageBus>,
    locks: IntentLockRegistry,
    config: Arc<CoordinatorConfig>,
    auction: Arc<AuctionController>,
}

impl AdmissionPipeline {
    pub fn new(
        pool: PgPool,
        cache: IntentCache,
        bus: Arc<dyn MessageBus>,
        locks: IntentLockRegistry,
        config: Arc<CoordinatorConfig>,
        auction: Arc<AuctionController>,
    ) -> Self {
        Self { pool, cache, bus, locks, config, auction }
    }

    pub async fn submit(&self, payload: IntentPayload, signature: [u8; 65]) -> Result<IntentSubmissionOutcome, ErrorKind> {
        self.validate_structure(&payload)?;

        let typed_data = IntentTypedData {
            tokenIn: payload.token_in,
            tokenOut: payload.token_out,
            amountIn: payload.amount_in,
            maxSlippageBps: payload.max_slippage_bps,
            deadline: Amount::from(payload.deadline.max(0) as u64),
            chainId: Amount::from(payload.chain_id),
            receiver: payload.receiver,
            nonce: payload.nonce,
        };
        let intent_hash =
            signature_validator::intent_hash(&typed_data, self.config.chain_id, self.config.settlement_contract);

        let guard = self.locks.acquire(intent_hash).await;
        let outcome = self.admit_locked(intent_hash, payload, signature).await;
        drop(guard);
        outcome
    }

    fn validate_structure(&self, payload: &IntentPayload) -> Result<(), ErrorKind> {
        if payload.amount_in.is_zero() {
            return Err(ErrorKind::invalid("amountIn", "must be positive"));
        }
        if payload.max_slippage_bps > 10_000 {
            return Err(ErrorKind::invalid("maxSlippageBps", "must be between 0 and 10000"));
        }
        if payload.deadline <= Utc::now().timestamp() {
            return Err(ErrorKind::invalid("deadline", "deadline has already passed"));
        }
        if payload.chain_id != self.config.chain_id {
            return Err(ErrorKind::invalid("chainId", "does not match this deployment"));
        }
        Ok(())
    }

    async fn admit_locked(
        &self,
        intent_hash: Hash,
        payload: IntentPayload,
        signature: [u8; 65],
    ) -> Result<IntentSubmissionOutcome, ErrorKind> {
        if let Some(existing) = self.existing_intent(&intent_hash).await? {
            metrics::get().intents_admitted.with_label_values(&["duplicate"]).inc();
            return Ok(IntentSubmissionOutcome::Duplicate(self.response_for(&existing, "duplicate")));
        }

        let signer = signature_validator::recover_signer(intent_hash, &signature).map_err(|_| {
            metrics::get().intents_admitted.with_label_values(&["invalid_signature"]).inc();
            ErrorKind::InvalidSignature
        })?;

        let now = Utc::now();
        if payload.deadline <= now.timestamp() {
            return Err(ErrorKind::invalid("deadline", "deadline has already passed"));
        }

        let mut intent = Intent::new(intent_hash, payload, signature, signer, now);

        // `insert` and the `New` → `Broadcasting` transition share one
        // transaction: a crash between them must never leave a row stuck at
        // `NEW` forever, since nothing but the expiry reaper would ever look
        // at it again otherwise (§4.5, §4.9).
        let mut tx = self.pool.begin().await.map_err(storage_unavailable)?;
        match intents::insert(&mut tx, &intent).await {
            Ok(()) => {}
            Err(err) if is_unique_violation(&err) => {
                drop(tx);
                let existing = self.existing_intent(&intent_hash).await?.expect("just violated its uniqueness constraint");
                metrics::get().intents_admitted.with_label_values(&["duplicate"]).inc();
                return Ok(IntentSubmissionOutcome::Duplicate(self.response_for(&existing, "duplicate")));
            }
            Err(err) => return Err(storage_unavailable(err)),
        }
        intents::update_status(&mut tx, &intent_hash, IntentStatus::Broadcasting, now)
            .await
            .map_err(storage_unavailable)?;
        tx.commit().await.map_err(storage_unavailable)?;

        intent.status = IntentStatus::Broadcasting;
        self.cache.insert(intent.clone()).await;

        self.bus.publish(
            topics::SOLVER_INTENTS,
            serde_json::json!({
                "intentHash": display_hash(&intent_hash),
                "intent": intent,
                "biddingWindowMs": self.config.bidding_window_ms,
                "createdAt": now,
            }),
        );

        self.arm_window_timer(intent_hash);
        metrics::get().intents_admitted.with_label_values(&["accepted"]).inc();

        Ok(IntentSubmissionOutcome::Created(IntentSubmissionResponse {
            intent_hash: display_hash(&intent_hash),
            bidding_window_ms: self.config.bidding_window_ms,
            expires_at: intent.expires_at,
            status: "success",
        }))
    }

    async fn existing_intent(&self, intent_hash: &Hash) -> Result<Option<Intent>, ErrorKind> {
        if let Some(intent) = self.cache.get(intent_hash).await {
            return Ok(Some((*intent).clone()));
        }
        let mut conn = self.pool.acquire().await.map_err(storage_unavailable)?;
        intents::by_hash(&mut conn, intent_hash).await.map_err(storage_unavailable)
    }

    fn arm_window_timer(&self, intent_hash: Hash) {
        let delay = std::time::Duration::from_millis(self.config.bidding_window_ms as u64);
        let auction = self.auction.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            auction.close_window(intent_hash).await;
        });
    }

    fn response_for(&self, intent: &Intent, status: &'static str) -> IntentSubmissionResponse {
        IntentSubmissionResponse {
            intent_hash: display_hash(&intent.intent_hash),
            bidding_window_ms: self.config.bidding_window_ms,
            expires_at: intent.expires_at,
            status,
        }
    }
}

fn display_hash(hash: &Hash) -> String {
    format!("0x{}", const_hex::encode(hash.as_slice()))
}

fn storage_unavailable(err: sqlx::Error) -> ErrorKind {
    ErrorKind::StorageUnavailable(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}
