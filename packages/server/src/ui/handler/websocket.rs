//! WebSocket connection handlers.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};

use crate::{
    domain::{CommentId, ConnectionId, ErrorCode, ProjectId},
    infrastructure::dto::websocket::ClientEvent,
    ui::state::AppState,
    usecase::{CommentAction, ConnectError},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// A rejected request: the code and message sent back in an `error` event
type Rejection = (ErrorCode, String);

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let token = query.token.or_else(|| bearer_token(&headers));

    let (tx, rx) = mpsc::channel(state.transport.outbound_buffer);
    let connection = match state.service.connect.execute(token.as_deref(), tx).await {
        Ok(connection) => connection,
        Err(ConnectError::AuthRequired) => {
            tracing::warn!("Rejected WebSocket handshake without a valid token");
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            tracing::error!("Failed to register connection: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let connection_id = connection.id;
    let state_for_failure = state.clone();
    Ok(ws
        .on_failed_upgrade(move |e| {
            tracing::warn!("WebSocket upgrade for '{}' failed: {}", connection_id, e);
            tokio::spawn(async move {
                state_for_failure
                    .service
                    .disconnect
                    .execute(&connection_id)
                    .await;
            });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, connection_id, rx)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Spawns a task that drains this connection's outbound queue into the WebSocket.
///
/// A Ping is sent every `heartbeat_interval` so that idle but healthy clients keep
/// answering with Pongs. The loop ends when the queue is closed (the connection was
/// reaped) or the socket can no longer be written.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
    heartbeat_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(heartbeat_interval);
        // The first tick completes immediately
        heartbeat.tick().await;

        loop {
            tokio::select! {
                payload = rx.recv() => {
                    let Some(payload) = payload else { break };
                    if sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    })
}

/// Handles inbound frames one at a time, which keeps this connection's events in order.
async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    connection_id: ConnectionId,
) {
    let idle_timeout = state.transport.idle_timeout;
    loop {
        let message = match tokio::time::timeout(idle_timeout, receiver.next()).await {
            Err(_) => {
                tracing::info!(
                    "Connection '{}' idle for {:?}, closing",
                    connection_id,
                    idle_timeout
                );
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::warn!("WebSocket error on '{}': {}", connection_id, e);
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => dispatch(&state, &connection_id, text.as_str()).await,
            Message::Close(_) => {
                tracing::info!("Connection '{}' requested close", connection_id);
                break;
            }
            Message::Binary(_) => {
                tracing::debug!("Ignoring binary frame from '{}'", connection_id);
            }
            // Ping / Pong only count as liveness
            _ => {}
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    rx: mpsc::Receiver<String>,
) {
    let (sender, receiver) = socket.split();
    let shutdown = shutdown_requested(state.shutdown.subscribe());

    let mut send_task = pusher_loop(rx, sender, state.transport.heartbeat_interval);
    let mut recv_task = tokio::spawn(receive_loop(receiver, state.clone(), connection_id));

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
        _ = shutdown => {
            recv_task.abort();
            send_task.abort();
        }
    };

    state.service.disconnect.execute(&connection_id).await;
}

async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}

async fn dispatch(state: &AppState, connection_id: &ConnectionId, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Malformed event from '{}': {}", connection_id, e);
            state
                .service
                .reject(
                    connection_id,
                    ErrorCode::BadRequest,
                    format!("malformed event: {}", e),
                )
                .await;
            return;
        }
    };

    if let Err((code, message)) = route_event(state, connection_id, event).await {
        tracing::warn!(
            "Rejected request from '{}': {:?} {}",
            connection_id,
            code,
            message
        );
        state.service.reject(connection_id, code, message).await;
    }
}

async fn route_event(
    state: &AppState,
    connection_id: &ConnectionId,
    event: ClientEvent,
) -> Result<(), Rejection> {
    let service = &state.service;
    match event {
        ClientEvent::JoinProject { project_id } => {
            let project_id = parse_project(project_id)?;
            service
                .join_project
                .execute(connection_id, &project_id)
                .await
                .map_err(|e| (e.code(), e.to_string()))?;
        }
        ClientEvent::LeaveProject { project_id } => {
            let project_id = parse_project(project_id)?;
            service
                .leave_project
                .execute(connection_id, &project_id)
                .await
                .map_err(|e| (e.code(), e.to_string()))?;
        }
        ClientEvent::StatusUpdate { status, project_id } => {
            let project_id = project_id.map(parse_project).transpose()?;
            service
                .update_status
                .execute(connection_id, &status, project_id.as_ref())
                .await
                .map_err(|e| (e.code(), e.to_string()))?;
        }
        ClientEvent::CursorMove { project_id, cursor } => {
            let project_id = parse_project(project_id)?;
            service
                .move_cursor
                .execute(connection_id, &project_id, cursor)
                .await
                .map_err(|e| (e.code(), e.to_string()))?;
        }
        ClientEvent::PostComment {
            project_id,
            content,
            position,
        } => {
            let project_id = parse_project(project_id)?;
            service
                .post_comment
                .execute(connection_id, &project_id, content, position)
                .await
                .map_err(|e| (e.code(), e.to_string()))?;
        }
        ClientEvent::DeleteComment {
            project_id,
            comment_id,
        } => {
            manage_comment(state, connection_id, project_id, comment_id, CommentAction::Delete)
                .await?;
        }
        ClientEvent::ResolveComment {
            project_id,
            comment_id,
        } => {
            manage_comment(
                state,
                connection_id,
                project_id,
                comment_id,
                CommentAction::Resolve,
            )
            .await?;
        }
        ClientEvent::RequestPresence { project_id } => {
            let project_id = parse_project(project_id)?;
            service
                .get_presence
                .request(connection_id, &project_id)
                .await
                .map_err(|e| (e.code(), e.to_string()))?;
        }
        ClientEvent::Heartbeat { project_id } => {
            let project_id = project_id.map(parse_project).transpose()?;
            service
                .heartbeat
                .execute(connection_id, project_id.as_ref())
                .await
                .map_err(|e| (e.code(), e.to_string()))?;
        }
    }
    Ok(())
}

async fn manage_comment(
    state: &AppState,
    connection_id: &ConnectionId,
    project_id: String,
    comment_id: String,
    action: CommentAction,
) -> Result<(), Rejection> {
    let project_id = parse_project(project_id)?;
    let comment_id =
        CommentId::new(comment_id).map_err(|e| (ErrorCode::BadRequest, e.to_string()))?;
    state
        .service
        .manage_comment
        .execute(connection_id, &project_id, &comment_id, action)
        .await
        .map_err(|e| (e.code(), e.to_string()))
}

fn parse_project(project_id: String) -> Result<ProjectId, Rejection> {
    ProjectId::new(project_id).map_err(|e| (ErrorCode::BadRequest, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_from_header() {
        // テスト項目: Authorization ヘッダーの Bearer トークンを取り出せる
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer token-alice"));

        // when (操作):
        let token = bearer_token(&headers);

        // then (期待する結果):
        assert_eq!(token.as_deref(), Some("token-alice"));
    }

    #[test]
    fn test_bearer_token_ignores_other_schemes() {
        // テスト項目: Bearer 以外の認証方式は無視する
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YWxpY2U6"));

        // when (操作) / then (期待する結果):
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_parse_project_rejects_blank_id() {
        // テスト項目: 空のプロジェクト ID は BadRequest
        // given (前提条件):
        let project_id = " ".to_string();

        // when (操作):
        let result = parse_project(project_id);

        // then (期待する結果):
        assert_eq!(result.unwrap_err().0, ErrorCode::BadRequest);
    }
}
