//! In-process pub/sub (C4) and the hot-path intent cache (C4) that sits in
//! front of the intents store.
//!
//! The bus here is intentionally the in-process default the design notes
//! call for: an abstract [`MessageBus`] so a networked implementation can
//! replace it later without touching publishers or subscribers. Every
//! consumer must tolerate at-most-once delivery the same way a Redis
//! pub/sub consumer would.

pub mod cache;

use {dashmap::DashMap, serde_json::Value, std::sync::Arc, tokio::sync::broadcast};

/// Default channel capacity for newly created topics. A slow subscriber that
/// falls behind this many messages misses the oldest ones (`RecvError::Lagged`)
/// rather than applying back pressure to publishers.
const TOPIC_CAPACITY: usize = 1_024;

/// Fan-out pub/sub keyed by topic name. Cloning is cheap: it shares the
/// underlying map via `Arc`.
pub trait MessageBus: Send + Sync {
    fn publish(&self, topic: &str, payload: Value);
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<Value>;
}

/// The in-process default: one `broadcast::Sender` per topic, created
/// lazily on first publish or subscribe.
#[derive(Clone)]
pub struct InProcessBus(Arc<DashMap<String, broadcast::Sender<Value>>>);

impl InProcessBus {
    pub fn new() -> Self {
        Self(Arc::new(DashMap::new()))
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Value> {
        self.0
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for InProcessBus {
    /// Publishing to a topic with no subscribers is not an error: the
    /// solver fan-out topic has no listeners until the first solver
    /// session connects, and messages published before that are simply
    /// dropped (at-most-once).
    fn publish(&self, topic: &str, payload: Value) {
        let sender = self.sender(topic);
        let _ = sender.send(payload);
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<Value> {
        self.sender(topic).subscribe()
    }
}

/// Canonical topic names (§4 Implementation notes).
pub mod topics {
    pub const SOLVER_INTENTS: &str = "solver:intents";
    pub const COORDINATOR_BID_SELECTION: &str = "coordinator:bid_selection";

    pub fn ws_bid_update(intent_hash: &str) -> String {
        format!("ws:bid_update:{intent_hash}")
    }

    pub fn ws_intent_status(intent_hash: &str) -> String {
        format!("ws:intent_status:{intent_hash}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_message_published_after_it_subscribes() {
        let bus = InProcessBus::new();
        let mut rx = bus.subscribe(topics::SOLVER_INTENTS);
        bus.publish(topics::SOLVER_INTENTS, serde_json::json!({"intentHash": "0xabc"}));
        let received = rx.recv().await.unwrap();
        assert_eq!(received["intentHash"], "0xabc");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = InProcessBus::new();
        bus.publish(topics::COORDINATOR_BID_SELECTION, serde_json::json!({}));
    }
}
