use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use uuid::Uuid;

use bas_hub::{new_session, SessionKind};
use bas_wire::Envelope;

use crate::auth::dashboard_token_matches;
use crate::state::AppState;

/// `GET /ws/dashboard` — receives only server-to-client lifecycle events;
/// the one client-to-server message it accepts is `ping`, answered `pong`
/// (§4.3, §6).
pub async fn handler(ws: WebSocketUpgrade, headers: HeaderMap, State(state): State<AppState>) -> Response {
    if !dashboard_token_matches(&headers, &state.auth.dashboard_token) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| run(socket, state)).into_response()
}

async fn run(socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    let session_config = state.session_config();

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let dispatcher = Arc::new(move |_id: Uuid, bytes: Vec<u8>| {
        let _ = frame_tx.send(bytes);
    });

    let (unregister_tx, mut unregister_rx) = mpsc::unbounded_channel::<Uuid>();
    let (handle, reader, writer) = new_session(
        id,
        SessionKind::Dashboard,
        socket,
        &session_config,
        dispatcher,
        unregister_tx,
    );
    tokio::spawn(reader);
    tokio::spawn(writer);
    {
        let hub = state.hub.clone();
        tokio::spawn(async move {
            while let Some(id) = unregister_rx.recv().await {
                hub.unregister(id);
            }
        });
    }

    // Dashboards never carry a paw; register immediately so broadcasts reach
    // them from the moment the socket opens. Keep a clone to answer pings
    // directly, since the hub owns the original once registered.
    let replies = handle.clone();
    state.hub.register(handle);
    tracing::info!(session = %id, "dashboard connected");

    while let Some(bytes) = frame_rx.recv().await {
        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(session = %id, error = %err, "malformed dashboard frame, discarding");
                continue;
            }
        };
        if envelope.frame_type == "ping" {
            let pong = Envelope::new("pong", serde_json::Value::Null);
            if let Ok(bytes) = serde_json::to_vec(&pong) {
                replies.send(bytes);
            }
        } else {
            tracing::debug!(session = %id, frame_type = %envelope.frame_type, "unrecognized dashboard frame type, ignoring");
        }
    }
}
