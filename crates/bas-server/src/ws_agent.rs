use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use bas_hub::{new_session, SessionKind};
use bas_types::{Agent, AgentStatus};
use bas_wire::{decode_agent_frame, encode_server_frame, AgentFrame, RegisteredPayload, ServerFrame};

use crate::auth::agent_key_matches;
use crate::state::AppState;

/// `GET /ws/agent` — the only way an agent joins the fleet (§6).
pub async fn handler(ws: WebSocketUpgrade, headers: HeaderMap, State(state): State<AppState>) -> Response {
    if !agent_key_matches(&headers, &state.auth.agent_key) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| run(socket, state))
        .into_response()
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
        SessionKind::Agent,
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

    let mut handle = Some(handle);
    let mut paw: Option<String> = None;

    while let Some(bytes) = frame_rx.recv().await {
        let frame = match decode_agent_frame(&bytes) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(session = %id, error = %err, "malformed agent frame, discarding");
                continue;
            }
        };

        match frame {
            AgentFrame::Register(payload) => {
                let Some(session) = handle.take() else {
                    tracing::warn!(session = %id, paw = %payload.paw, "duplicate register frame ignored");
                    continue;
                };

                if let Err(err) = upsert_agent(&state, &payload).await {
                    tracing::error!(paw = %payload.paw, error = %err, "failed to persist agent registration");
                    continue;
                }

                session.bind_paw(payload.paw.clone()).await;
                tracing::info!(session = %id, paw = %payload.paw, "agent registered");

                let ack = ServerFrame::Registered(RegisteredPayload::ok(payload.paw.clone()));
                match encode_server_frame(&ack) {
                    Ok(bytes) => {
                        session.send(bytes);
                    }
                    Err(err) => tracing::error!(paw = %payload.paw, error = %err, "failed to encode registered ack"),
                }

                paw = Some(payload.paw);
                state.hub.register(session);
            }
            AgentFrame::Heartbeat(payload) => {
                if paw.as_deref() != Some(payload.paw.as_str()) {
                    tracing::warn!(session = %id, "heartbeat before registration, discarding");
                    continue;
                }
                if let Err(err) = state.agent_repo.update_last_seen(&payload.paw, Utc::now()).await {
                    tracing::error!(paw = %payload.paw, error = %err, "failed to record heartbeat");
                }
            }
            AgentFrame::TaskResult(payload) => {
                let Some(paw) = paw.as_deref() else {
                    tracing::warn!(session = %id, "task_result before registration, discarding");
                    continue;
                };
                state.orchestrator.handle_task_result(payload, paw).await;
            }
            AgentFrame::Unknown(frame_type, _) => {
                tracing::debug!(session = %id, frame_type, "unrecognized agent frame type, ignoring");
            }
        }
    }
}

async fn upsert_agent(state: &AppState, payload: &bas_wire::RegisterPayload) -> Result<(), bas_core::RepositoryError> {
    let existing = state.agent_repo.find_by_paw(&payload.paw).await?;
    let is_new = existing.is_none();
    let mut agent = existing.unwrap_or_else(|| {
        Agent::new(payload.paw.clone(), payload.hostname.clone(), payload.platform)
    });

    agent.hostname = payload.hostname.clone();
    agent.username = payload.username.clone();
    agent.platform = payload.platform;
    agent.executors = payload.executors.iter().cloned().collect();
    agent.status = AgentStatus::Online;
    agent.last_seen = Utc::now();

    if is_new {
        state.agent_repo.create(agent).await
    } else {
        state.agent_repo.update(agent).await
    }
}
