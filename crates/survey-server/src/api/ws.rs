//! WebSocket live channel.
//!
//! Clients join mission groups, relay drone positions to them and chat with
//! the operator assistant. Frames are `{"event": ..., "data": ...}`.
use crate::hub::ObserverId;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use std::sync::Arc;
use survey_core::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut observer = state.hub().connect();
    let (replies_tx, mut replies) = mpsc::unbounded_channel::<ServerEvent>();
    tracing::info!("Live client {} connected", observer.id);

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_frame(&state, observer.id, &text, &replies_tx) {
                            if send_event(&mut socket, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            update = observer.updates.recv() => {
                match update {
                    Some(update) => {
                        let event = ServerEvent::DronePosition(update.as_ref().clone());
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    // Hub shut down.
                    None => break,
                }
            }
            Some(reply) = replies.recv() => {
                if send_event(&mut socket, &reply).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub().disconnect(observer.id);
    tracing::info!("Live client {} disconnected", observer.id);
}

/// Apply one client frame. Returns an immediate reply, if any; chat replies
/// arrive later through `replies`.
fn handle_frame(
    state: &Arc<AppState>,
    observer: ObserverId,
    text: &str,
    replies: &mpsc::UnboundedSender<ServerEvent>,
) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!("Live client {} sent an unreadable frame: {}", observer, err);
            return Some(ServerEvent::Error(format!("unreadable frame: {err}")));
        }
    };

    match event {
        ClientEvent::JoinMission(mission_id) => {
            state.hub().subscribe(observer, &mission_id);
            tracing::info!("Live client {} joined mission {}", observer, mission_id);
        }
        ClientEvent::LeaveMission(mission_id) => {
            state.hub().unsubscribe(observer, &mission_id);
        }
        ClientEvent::DroneUpdate(update) => {
            let mission_id = update.mission_id.clone();
            let reached = state.hub().publish_position(update);
            tracing::debug!("Relayed position for mission {} to {} observers", mission_id, reached);
        }
        ClientEvent::ChatMessage(message) => {
            let state = state.clone();
            let replies = replies.clone();
            tokio::spawn(async move {
                let answer = state.chat(&message).await;
                let _ = replies.send(ServerEvent::ChatResponse(answer));
            });
        }
    }
    None
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(text) => socket.send(Message::Text(text)).await,
        Err(err) => {
            tracing::error!("Failed to encode live event: {}", err);
            Ok(())
        }
    }
}
