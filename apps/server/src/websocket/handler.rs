//! WebSocket upgrade handler
//!
//! Every upgraded connection becomes one session participant. The socket is
//! split into a writer task draining the participant's outbound queue and a
//! reader task dispatching inbound frames in arrival order. When either side
//! finishes, the other is aborted and the participant is removed.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Extension,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::middleware::extract_client_ip;

use super::messages::{parse_client_message, ServerMessage};
use super::session::SessionCoordinator;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(coordinator): Extension<SessionCoordinator>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    upgrade(ws, coordinator, connect_info, &headers)
}

/// Upgrade an accepted request into a session connection
pub fn upgrade(
    ws: WebSocketUpgrade,
    coordinator: SessionCoordinator,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
) -> Response {
    let client_ip = extract_client_ip(headers, connect_info.as_ref());

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(
        client_ip = %client_ip,
        user_agent = %user_agent,
        "WebSocket upgrade requested"
    );

    ws.on_upgrade(move |socket| handle_socket(socket, coordinator, client_ip))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, coordinator: SessionCoordinator, client_ip: String) {
    // Unbounded so that a slow socket never stalls a broadcast
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let joined = coordinator.join(tx);
    let connection_id = joined.connection_id;
    let participant_id = joined.participant.id;

    tracing::info!(
        participant_id = %participant_id,
        connection_id = %connection_id,
        client_ip = %client_ip,
        "WebSocket connection established"
    );

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward queued messages to the socket. The queue closes when the
    // coordinator drops this participant, which also closes the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        tracing::debug!(participant_id = %participant_id, "WebSocket send failed");
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                }
            }
        }
        let _ = ws_sender.close().await;
    });

    // Handle incoming messages
    let recv_coordinator = coordinator.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match parse_client_message(&text) {
                    Some(msg) => recv_coordinator.handle_message(connection_id, msg),
                    None => {
                        tracing::debug!(
                            participant_id = %participant_id,
                            "Dropping malformed message"
                        );
                    }
                },
                Ok(Message::Binary(_)) => {
                    tracing::trace!(participant_id = %participant_id, "Ignoring binary frame");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pings are answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(participant_id = %participant_id, "WebSocket close received");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, participant_id = %participant_id, "WebSocket error");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete, then abort the other
    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(participant_id = %participant_id, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(participant_id = %participant_id, "Receive task completed");
            send_task.abort();
        }
    }

    coordinator.leave(connection_id);

    tracing::info!(
        participant_id = %participant_id,
        connection_id = %connection_id,
        client_ip = %client_ip,
        "WebSocket connection closed"
    );
}
