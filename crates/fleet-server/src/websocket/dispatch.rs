//! `/ws/dispatch` — dashboard-facing WebSocket gateway.
//!
//! Each dashboard gets a generated session id. On connect it receives the
//! current courier-connection snapshot (pushed by the registry) followed by
//! a `dispatch_connected` welcome with connection statistics.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::StreamExt;
use futures::stream::SplitStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use fleet_core::DashboardSessionId;
use fleet_events::message::{DispatchConnectedPayload, DispatchMessage, now_ts};
use fleet_registry::{MpscChannel, send_envelope};

use crate::server::AppState;
use crate::websocket::handler::handle_dispatch_message;
use crate::websocket::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::websocket::rider::write_loop;

/// GET /ws/dispatch — upgrade handler.
pub async fn dispatch_ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(state.settings.max_message_size)
        .on_upgrade(move |socket| dispatch_connection(state, socket))
}

/// Drive one dashboard connection from handshake to cleanup.
async fn dispatch_connection(state: AppState, socket: WebSocket) {
    let session_id = DashboardSessionId::new();
    let (sink, stream) = socket.split();

    let (tx, rx) = mpsc::channel(state.settings.channel_buffer);
    let channel = Arc::new(MpscChannel::new(tx));
    let cancel = state.shutdown.token().child_token();

    let ping_interval = Duration::from_millis(state.settings.heartbeat_interval_ms);
    let writer = tokio::spawn(write_loop(sink, rx, ping_interval, cancel.clone()));

    // Registration pushes the connected-riders snapshot; the welcome with
    // stats follows it on the same ordered channel.
    state
        .registry
        .register_dashboard(session_id.clone(), channel.clone());
    let _ = send_envelope(
        channel.as_ref(),
        &DispatchMessage::DispatchConnected(DispatchConnectedPayload {
            session_id: session_id.to_string(),
            connection_stats: state.registry.stats(),
            connected_riders: state.registry.connected_courier_ids(),
            server_time: now_ts(),
        }),
    );

    let heartbeat = {
        let channel = channel.clone();
        let cancel = cancel.clone();
        let interval = Duration::from_millis(state.settings.heartbeat_interval_ms);
        let timeout = Duration::from_millis(state.settings.heartbeat_timeout_ms);
        tokio::spawn(async move {
            if run_heartbeat(channel, interval, timeout, cancel.clone()).await
                == HeartbeatResult::TimedOut
            {
                info!("dashboard heartbeat timed out, closing connection");
                cancel.cancel();
            }
        })
    };

    read_loop(&state, &session_id, channel.clone(), stream, &cancel).await;

    cancel.cancel();
    let _ = state.registry.unregister_dashboard(&session_id);
    let _ = writer.await;
    let _ = heartbeat.await;
    debug!(session_id = %session_id, "dashboard connection closed");
}

/// Process inbound frames until the socket closes or the connection is
/// cancelled.
async fn read_loop(
    state: &AppState,
    session_id: &DashboardSessionId,
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
                        handle_dispatch_message(state, session_id, channel.as_ref(), text.as_str());
                    }
                    Some(Ok(Message::Pong(_) | Message::Ping(_))) => channel.mark_alive(),
                    Some(Ok(Message::Binary(_))) => {
                        debug!(session_id = %session_id, "ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(session_id = %session_id, error = %e, "dashboard socket error");
                        break;
                    }
                }
            }
            () = cancel.cancelled() => break,
        }
    }
}
