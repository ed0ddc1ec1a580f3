//! WebSocket Handler
//!
//! - `/ws/session/{id}`: 单个生成会话的生命周期事件
//! - `/ws/events`: 会话开始/结束的全局通知

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::infrastructure::http::state::AppState;

/// 会话已结束时发送的快照消息
#[derive(Serialize)]
struct SessionSnapshot<'a> {
    event: &'static str,
    data: &'a crate::application::GenerationSession,
}

/// Session WebSocket 连接处理
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session_socket(socket, session_id, state))
}

/// 全局 WebSocket 连接处理
pub async fn global_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_global_socket(socket, state))
}

fn to_message<T: Serialize>(event: &T) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize event");
            None
        }
    }
}

async fn handle_session_socket(socket: WebSocket, session_id: String, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let session = match state.session_manager.get(&session_id) {
        Ok(session) => session,
        Err(_) => {
            tracing::warn!(session_id = %session_id, "WebSocket connection rejected: unknown session");
            let _ = sender.close().await;
            return;
        }
    };

    // 订阅后再次确认状态，已结束的会话只回放最终状态
    let live = if session.status.is_terminal() {
        None
    } else {
        state.event_publisher.register_live_session(&session_id, || {
            state
                .session_manager
                .get(&session_id)
                .map(|s| !s.status.is_terminal())
                .unwrap_or(false)
        })
    };
    let Some(mut event_rx) = live else {
        let latest = state.session_manager.get(&session_id).unwrap_or(session);
        let snapshot = SessionSnapshot {
            event: "session_snapshot",
            data: &latest,
        };
        if let Some(msg) = to_message(&snapshot) {
            let _ = sender.send(msg).await;
        }
        let _ = sender.close().await;
        return;
    };

    tracing::info!(session_id = %session_id, "WebSocket connected");

    let session_id_for_forward = session_id.clone();
    let session_id_for_receive = session_id.clone();

    // 事件转发任务，终态事件之后关闭连接
    let forward_task = tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        session_id = %session_id_for_forward,
                        skipped,
                        "WebSocket subscriber lagged, events dropped"
                    );
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let terminal = event.is_terminal();
            if let Some(msg) = to_message(&event) {
                if let Err(e) = sender.send(msg).await {
                    tracing::debug!(
                        session_id = %session_id_for_forward,
                        error = %e,
                        "Failed to send WebSocket message"
                    );
                    break;
                }
            }
            if terminal {
                let _ = sender.close().await;
                break;
            }
        }
    });

    // 接收客户端消息（心跳/关闭）
    let receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id_for_receive, "WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(session_id = %session_id_for_receive, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = forward_task => {}
        _ = receive_task => {}
    }

    tracing::info!(session_id = %session_id, "WebSocket disconnected");
}

async fn handle_global_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut event_rx = state.event_publisher.subscribe_global();

    tracing::info!("Global WebSocket connected");

    let forward_task = tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            let Some(msg) = to_message(&event) else {
                continue;
            };
            if let Err(e) = sender.send(msg).await {
                tracing::debug!(error = %e, "Failed to send global WebSocket message");
                break;
            }
        }
    });

    let receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!("Global WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Global WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = forward_task => {}
        _ = receive_task => {}
    }

    tracing::info!("Global WebSocket disconnected");
}
