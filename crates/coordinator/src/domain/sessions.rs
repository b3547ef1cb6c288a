//! WebSocket message contracts shared by solver sessions (C7) and
//! subscriber sessions (C8). The axum-specific read/write loop lives in
//! `crate::api::ws`; this module only knows about envelopes and the
//! bounded-queue/back-pressure policy (§4.7, §4.8, §5).

use serde::{Deserialize, Serialize};

/// Client → server frames (§6).
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Auth { token: String },
    Subscribe { intent_hash: String },
    Unsubscribe { intent_hash: String },
    Ping,
}

/// Server → client frames (§6). `data` carries whatever the variant needs;
/// kept as a raw `Value` here since each message type's shape is already
/// defined where it's published (bus payloads, `IntentSubmissionResponse`,
/// etc.) — this struct only wraps the common envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ServerMessage {
    pub fn new(kind: &'static str, data: serde_json::Value) -> Self {
        Self { kind, timestamp: chrono::Utc::now(), data, id: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", serde_json::json!({"message": message.into()}))
    }
}

/// Outcome of a queue push under back-pressure (§4.7): the session manager
/// closes the connection on overflow rather than blocking the publisher.
pub enum QueueOutcome {
    Sent,
    Overflowed,
}

/// Pushes `message` onto a bounded `mpsc` sender without awaiting capacity —
/// a full queue means the session is too slow and must be dropped, not
/// back-pressured onto the rest of the system (§5 Shared-resource policy).
pub fn try_enqueue(sender: &tokio::sync::mpsc::Sender<ServerMessage>, message: ServerMessage) -> QueueOutcome {
    match sender.try_send(message) {
        Ok(()) => QueueOutcome::Sent,
        Err(_) => QueueOutcome::Overflowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_message_parses_from_json() {
        let raw = r#"{"type":"auth","token":"abc"}"#;
        let parsed: ClientMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(parsed, ClientMessage::Auth { token } if token == "abc"));
    }

    #[test]
    fn subscribe_message_parses_from_json() {
        let raw = r#"{"type":"subscribe","intent_hash":"0xabc"}"#;
        let parsed: ClientMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(parsed, ClientMessage::Subscribe { intent_hash } if intent_hash == "0xabc"));
    }

    #[tokio::test]
    async fn overflowing_the_queue_reports_back_pressure() {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        assert!(matches!(try_enqueue(&tx, ServerMessage::new("pong", serde_json::json!({}))), QueueOutcome::Sent));
        assert!(matches!(try_enqueue(&tx, ServerMessage::new("pong", serde_json::json!({}))), QueueOutcome::Overflowed));
    }
}
