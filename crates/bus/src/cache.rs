//! TTL cache fronting the intents store, keyed `intent:<hash>` (§4
//! Implementation notes). Each entry expires exactly at the intent's
//! `expiresAt` rather than on a fixed TTL, via a custom [`moka::Expiry`].

use {
    chrono::{DateTime, Utc},
    model::{Hash, Intent},
    moka::Expiry,
    std::{sync::Arc, time::Duration},
};

#[derive(Clone)]
struct Entry {
    intent: Arc<Intent>,
}

struct ExpireAtDeadline;

impl Expiry<Hash, Entry> for ExpireAtDeadline {
    fn expire_after_create(
        &self,
        _key: &Hash,
        value: &Entry,
        _current_time: std::time::Instant,
    ) -> Option<Duration> {
        duration_until(value.intent.expires_at)
    }
}

/// `moka` wants a `Duration` from "now"; we only have a wall-clock deadline,
/// which is close enough here since a cache miss just re-derives from the
/// store.
fn duration_until(expires_at: DateTime<Utc>) -> Option<Duration> {
    expires_at.signed_duration_since(Utc::now()).to_std().ok()
}

/// Caches intents between admission and auction close so `submit_bid`'s
/// lookup (§4.6 step 2) rarely round-trips to Postgres.
#[derive(Clone)]
pub struct IntentCache(moka::future::Cache<Hash, Entry>);

impl IntentCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(ExpireAtDeadline)
            .build();
        Self(cache)
    }

    pub async fn insert(&self, intent: Intent) {
        let key = intent.intent_hash;
        self.0.insert(key, Entry { intent: Arc::new(intent) }).await;
    }

    pub async fn get(&self, intent_hash: &Hash) -> Option<Arc<Intent>> {
        self.0.get(intent_hash).await.map(|entry| entry.intent)
    }

    pub async fn invalidate(&self, intent_hash: &Hash) {
        self.0.invalidate(intent_hash).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Address, Amount, IntentPayload};

    fn sample_intent(expires_in_secs: i64) -> Intent {
        let now = Utc::now();
        Intent::new(
            Hash::repeat_byte(1),
            IntentPayload {
                token_in: Address::ZERO,
                token_out: Address::repeat_byte(2),
                amount_in: Amount::from(1u8),
                max_slippage_bps: 50,
                deadline: now.timestamp() + expires_in_secs,
                chain_id: 1,
                receiver: Address::ZERO,
                nonce: Amount::from(1u8),
            },
            [0u8; 65],
            Address::repeat_byte(3),
            now,
        )
    }

    #[tokio::test]
    async fn cached_intent_is_retrievable_before_it_expires() {
        let cache = IntentCache::new(1_000);
        let intent = sample_intent(300);
        let hash = intent.intent_hash;
        cache.insert(intent).await;
        assert!(cache.get(&hash).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_removes_the_entry() {
        let cache = IntentCache::new(1_000);
        let intent = sample_intent(300);
        let hash = intent.intent_hash;
        cache.insert(intent).await;
        cache.invalidate(&hash).await;
        assert!(cache.get(&hash).await.is_none());
    }
}
