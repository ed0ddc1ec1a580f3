//! Ping Handler
//!
//! 健康检查，附带当前运行中的生成会话数

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::infrastructure::http::state::AppState;

#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub active_sessions: usize,
}

pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    let active_sessions = state
        .session_manager
        .list_all()
        .iter()
        .filter_map(|id| state.session_manager.get(id).ok())
        .filter(|session| !session.status.is_terminal())
        .count();

    Json(PingResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        active_sessions,
    })
}
