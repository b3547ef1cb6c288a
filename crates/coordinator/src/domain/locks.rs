//! Per-intent lock registry (§5): all mutations to a given intent's auction
//! are serialized through the mutex keyed by its hash; different intents
//! proceed fully in parallel. Garbage collected when an intent reaches a
//! terminal status.

use {dashmap::DashMap, model::Hash, std::sync::Arc, tokio::sync::Mutex};

#[derive(Clone, Default)]
pub struct IntentLockRegistry(Arc<DashMap<Hash, Arc<Mutex<()>>>>);

impl IntentLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, intent_hash: Hash) -> Arc<Mutex<()>> {
        self.0.entry(intent_hash).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Acquires the lock for `intent_hash`, creating it on first use. Holds
    /// no I/O under the guard — callers gather inputs, mutate, release,
    /// then publish (§5 suspension-point discipline).
    pub async fn acquire(&self, intent_hash: Hash) -> tokio::sync::OwnedMutexGuard<()> {
        self.entry(intent_hash).lock_owned().await
    }

    /// Drops the registry's entry for a terminal intent. Any guard already
    /// held keeps the `Arc` alive until released; this only stops the map
    /// from growing unboundedly over the process lifetime.
    pub fn forget(&self, intent_hash: &Hash) {
        self.0.remove(intent_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_waits_for_the_first_to_release() {
        let registry = IntentLockRegistry::new();
        let hash = Hash::repeat_byte(1);

        let guard = registry.acquire(hash).await;
        let registry2 = registry.clone();
        let handle = tokio::spawn(async move {
            let _guard = registry2.acquire(hash).await;
        });

        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        drop(guard);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn forget_does_not_panic_on_unknown_hash() {
        let registry = IntentLockRegistry::new();
        registry.forget(&Hash::repeat_byte(9));
    }
}
