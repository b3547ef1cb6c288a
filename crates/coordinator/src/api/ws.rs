//! WebSocket upgrade handlers for solver sessions (C7) and subscriber
//! sessions (C8). The envelope and back-pressure policy live in
//! `crate::domain::sessions`; this module only owns the axum-specific
//! split-socket plumbing and the bus-to-queue forwarding tasks.

use {
    crate::{
        domain::{
            auth::bearer_token,
            sessions::{try_enqueue, ClientMessage, QueueOutcome, ServerMessage},
        },
        infra::state::AppState,
        metrics,
    },
    axum::{
        extract::{
            ws::{Message, WebSocket},
            State, WebSocketUpgrade,
        },
        response::Response,
        routing::get,
        Router,
    },
    futures::{SinkExt, StreamExt},
    std::time::Duration,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws/solver", get(solver_upgrade))
        .route("/ws/subscriber", get(subscriber_upgrade))
        .with_state(state)
}

/// How long a freshly-opened connection has to send an `auth` frame before
/// it's dropped.
const AUTH_GRACE_PERIOD: Duration = Duration::from_secs(10);

async fn solver_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_solver_session(socket, state))
}

async fn subscriber_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_subscriber_session(socket, state))
}

/// Waits (with a timeout) for the client's first frame to be a valid `auth`
/// message for `audience`, returning the authenticated subject.
async fn authenticate(
    socket: &mut WebSocket,
    verifier: &crate::domain::auth::AuthVerifier,
) -> Result<String, ()> {
    let next = tokio::time::timeout(AUTH_GRACE_PERIOD, socket.next()).await;
    let Ok(Some(Ok(Message::Text(text)))) = next else {
        return Err(());
    };
    let Ok(ClientMessage::Auth { token }) = serde_json::from_str::<ClientMessage>(&text) else {
        return Err(());
    };
    let token = bearer_token(&token).unwrap_or(&token);
    verifier.verify(token).map(|claims| claims.sub).map_err(|_| ())
}

async fn run_solver_session(mut socket: WebSocket, state: AppState) {
    let Ok(solver_id) = authenticate(&mut socket, &state.solver_auth).await else {
        let _ = socket.send(Message::text(
            serde_json::to_string(&ServerMessage::error("authentication failed")).expect("json"),
        )).await;
        return;
    };
    let _ = socket
        .send(Message::text(
            serde_json::to_string(&ServerMessage::new("auth_response", serde_json::json!({"sub": solver_id})))
                .expect("json"),
        ))
        .await;

    metrics::get().solver_sessions_active.inc();
    let (tx, rx) = tokio::sync::mpsc::channel(state.session_queue_capacity);
    let bus_rx = state.bus.subscribe(bus::topics::SOLVER_INTENTS);

    run_session_loop(socket, tx, rx, bus_rx, "IntentCreated", state.config.ws_heartbeat_interval, state.config.ws_connection_timeout).await;
    metrics::get().solver_sessions_active.dec();
}

async fn run_subscriber_session(mut socket: WebSocket, state: AppState) {
    let Ok(_subject) = authenticate(&mut socket, &state.subscriber_auth).await else {
        let _ = socket.send(Message::text(
            serde_json::to_string(&ServerMessage::error("authentication failed")).expect("json"),
        )).await;
        return;
    };
    let _ = socket
        .send(Message::text(serde_json::to_string(&ServerMessage::new("auth_response", serde_json::json!({}))).expect("json")))
        .await;

    metrics::get().subscriber_sessions_active.inc();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ServerMessage>(state.session_queue_capacity);
    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = serde_json::to_string(&message).expect("json");
            if sink.send(Message::text(text)).await.is_err() {
                break;
            }
        }
    });

    // One bus-forwarding task per `subscribe`d intent, cancelled on
    // `unsubscribe` or session end.
    let mut subscriptions: std::collections::HashMap<String, tokio::task::JoinHandle<()>> =
        std::collections::HashMap::new();

    loop {
        let Some(Ok(message)) = stream.next().await else { break };
        let Message::Text(text) = message else { continue };
        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Ping) => {
                if matches!(try_enqueue(&tx, ServerMessage::new("pong", serde_json::json!({}))), QueueOutcome::Overflowed) {
                    break;
                }
            }
            Ok(ClientMessage::Subscribe { intent_hash }) => {
                if subscriptions.contains_key(&intent_hash) {
                    continue;
                }
                let forward_tx = tx.clone();
                let mut bid_rx = state.bus.subscribe(&bus::topics::ws_bid_update(&intent_hash));
                let mut status_rx = state.bus.subscribe(&bus::topics::ws_intent_status(&intent_hash));
                let handle = tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            Ok(payload) = bid_rx.recv() => {
                                // The publisher (`AuctionController::admit_locked`) stamps
                                // which of the two message types this is; a non-leading
                                // bid must surface as `BidReceived`, never relabeled to
                                // `BestBidUpdated` (P4).
                                let kind: &'static str = match payload.get("messageType").and_then(|v| v.as_str()) {
                                    Some("BestBidUpdated") => "BestBidUpdated",
                                    _ => "BidReceived",
                                };
                                if matches!(try_enqueue(&forward_tx, ServerMessage::new(kind, payload)), QueueOutcome::Overflowed) {
                                    break;
                                }
                            }
                            Ok(payload) = status_rx.recv() => {
                                if matches!(try_enqueue(&forward_tx, ServerMessage::new("IntentUpdated", payload)), QueueOutcome::Overflowed) {
                                    break;
                                }
                            }
                            else => break,
                        }
                    }
                });
                subscriptions.insert(intent_hash.clone(), handle);
                if matches!(
                    try_enqueue(&tx, ServerMessage::new("subscription_confirmed", serde_json::json!({"intentHash": intent_hash}))),
                    QueueOutcome::Overflowed
                ) {
                    break;
                }
            }
            Ok(ClientMessage::Unsubscribe { intent_hash }) => {
                if let Some(handle) = subscriptions.remove(&intent_hash) {
                    handle.abort();
                }
            }
            Ok(ClientMessage::Auth { .. }) | Err(_) => {
                // Re-authenticating mid-session or a malformed frame is not
                // fatal; the client just gets an error back.
                if matches!(try_enqueue(&tx, ServerMessage::error("unexpected message")), QueueOutcome::Overflowed) {
                    break;
                }
            }
        }
    }

    for (_, handle) in subscriptions {
        handle.abort();
    }
    drop(tx);
    send_task.abort();
    metrics::get().subscriber_sessions_active.dec();
}

/// Shared send/heartbeat loop for the solver session, which has exactly one
/// implicit subscription (`solver:intents`) rather than subscriber's
/// dynamic per-intent set.
async fn run_session_loop(
    socket: WebSocket,
    tx: tokio::sync::mpsc::Sender<ServerMessage>,
    mut rx: tokio::sync::mpsc::Receiver<ServerMessage>,
    mut bus_rx: tokio::sync::broadcast::Receiver<serde_json::Value>,
    bus_message_type: &'static str,
    heartbeat_interval: Duration,
    connection_timeout: Duration,
) {
    let (mut sink, mut stream) = socket.split();
    let forward_tx = tx.clone();
    let forward_task = tokio::spawn(async move {
        while let Ok(payload) = bus_rx.recv().await {
            if matches!(try_enqueue(&forward_tx, ServerMessage::new(bus_message_type, payload)), QueueOutcome::Overflowed) {
                break;
            }
        }
    });

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = serde_json::to_string(&message).expect("json");
            if sink.send(Message::text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if matches!(try_enqueue(&tx, ServerMessage::new("ping", serde_json::json!({}))), QueueOutcome::Overflowed) {
                    break;
                }
            }
            frame = tokio::time::timeout(connection_timeout, stream.next()) => {
                match frame {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        if let Ok(ClientMessage::Ping) = serde_json::from_str::<ClientMessage>(&text) {
                            if matches!(try_enqueue(&tx, ServerMessage::new("pong", serde_json::json!({}))), QueueOutcome::Overflowed) {
                                break;
                            }
                        }
                    }
                    Ok(Some(Ok(_))) => {}
                    _ => break,
                }
            }
        }
    }

    forward_task.abort();
    drop(tx);
    send_task.abort();
}
