//! `/ws/riders` — courier-facing WebSocket gateway.
//!
//! A connection must identify itself with a positive rider id, from the
//! `riderId` query parameter or the `x-rider-id` header, before it is
//! registered; otherwise it receives an `AUTHENTICATION_FAILED` error and
//! the socket is closed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fleet_core::CourierId;
use fleet_events::envelope::MessageEnvelope;
use fleet_events::message::{ConnectionEstablishedPayload, DispatchMessage, now_ts};
use fleet_registry::{Channel, MpscChannel, send_envelope};

use crate::server::AppState;
use crate::websocket::handler::handle_rider_message;
use crate::websocket::heartbeat::{HeartbeatResult, run_heartbeat};

/// GET /ws/riders — upgrade handler.
pub async fn rider_ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let rider_id = extract_rider_id(&query, &headers);
    ws.max_message_size(state.settings.max_message_size)
        .on_upgrade(move |socket| rider_connection(state, socket, rider_id))
}

/// Pull a positive rider id out of the query string or headers.
fn extract_rider_id(query: &HashMap<String, String>, headers: &HeaderMap) -> Option<CourierId> {
    let raw = query
        .get("riderId")
        .map(String::as_str)
        .or_else(|| headers.get("x-rider-id").and_then(|v| v.to_str().ok()))?;
    let id: i64 = raw.trim().parse().ok()?;
    (id > 0).then(|| CourierId::new(id))
}

/// Drive one courier connection from handshake to cleanup.
async fn rider_connection(state: AppState, socket: WebSocket, rider_id: Option<CourierId>) {
    let (mut sink, stream) = socket.split();

    let Some(rider_id) = rider_id else {
        warn!("rider connection rejected: no rider id provided");
        let envelope = MessageEnvelope::new(DispatchMessage::error(
            "AUTHENTICATION_FAILED",
            "Rider ID is required",
        ));
        if let Ok(json) = envelope.to_json() {
            let _ = sink.send(Message::Text(json.into())).await;
        }
        let _ = sink.close().await;
        return;
    };

    let (tx, rx) = mpsc::channel(state.settings.channel_buffer);
    let channel = Arc::new(MpscChannel::new(tx));
    let handle: Arc<dyn Channel> = channel.clone();
    let cancel = state.shutdown.token().child_token();

    let ping_interval = Duration::from_millis(state.settings.heartbeat_interval_ms);
    let writer = tokio::spawn(write_loop(sink, rx, ping_interval, cancel.clone()));

    state.registry.register_courier(rider_id, handle.clone());
    let _ = send_envelope(
        channel.as_ref(),
        &DispatchMessage::ConnectionEstablished(ConnectionEstablishedPayload {
            rider_id,
            message: "Successfully connected to rider gateway".into(),
            server_time: now_ts(),
        }),
    );

    let heartbeat = spawn_heartbeat(&state, channel.clone(), cancel.clone());
    read_loop(&state, rider_id, channel.clone(), stream, &cancel).await;

    cancel.cancel();
    let _ = state
        .registry
        .unregister_courier_channel(rider_id, &handle);
    let _ = writer.await;
    let _ = heartbeat.await;
    debug!(rider_id = %rider_id, dropped = channel.drop_count(), "rider connection closed");
}

/// Heartbeat watchdog; cancels the connection when the peer goes silent.
fn spawn_heartbeat(
    state: &AppState,
    channel: Arc<MpscChannel>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_millis(state.settings.heartbeat_interval_ms);
    let timeout = Duration::from_millis(state.settings.heartbeat_timeout_ms);
    tokio::spawn(async move {
        if run_heartbeat(channel, interval, timeout, cancel.clone()).await
            == HeartbeatResult::TimedOut
        {
            info!("rider heartbeat timed out, closing connection");
            cancel.cancel();
        }
    })
}

/// Forward queued outbound messages to the socket and ping on an interval.
pub(crate) async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<String>>,
    ping_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ping = tokio::time::interval(ping_interval);
    ping.tick().await;

    loop {
        tokio::select! {
            queued = rx.recv() => {
                match queued {
                    Some(text) => {
                        if sink.send(Message::Text((*text).clone().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                    break;
                }
            }
            () = cancel.cancelled() => {
                let _ = sink.close().await;
                break;
            }
        }
    }
}

/// Process inbound frames until the socket closes or the connection is
/// cancelled.
async fn read_loop(
    state: &AppState,
    rider_id: CourierId,
    channel: Arc<MpscChannel>,
    mut stream: SplitStream<WebSocket>,
    cancel: &CancellationToken,
) {
    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        channel.mark_alive();
                        handle_rider_message(state, rider_id, channel.as_ref(), text.as_str());
                    }
                    Some(Ok(Message::Pong(_) | Message::Ping(_))) => channel.mark_alive(),
                    Some(Ok(Message::Binary(_))) => {
                        debug!(rider_id = %rider_id, "ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(rider_id = %rider_id, error = %e, "rider socket error");
                        break;
                    }
                }
            }
            () = cancel.cancelled() => break,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
