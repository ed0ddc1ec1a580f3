//! Generation HTTP Handlers
//!
//! 启动后立即返回 session_id，进度通过 `/ws/session/{id}` 推送

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{
    CancelGeneration, GenerationSession, GetSession, ListProjectSessions, PreviewContext,
    ResetGeneration, StartGeneration,
};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartGenerationRequest {
    pub project_id: Uuid,
    #[serde(default)]
    pub from_chapter: Option<u32>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
pub struct StartGenerationResponse {
    pub session_id: String,
    pub start_chapter: u32,
    pub total_chapters: u32,
    pub total_batches: u32,
    pub discarded_chapters: usize,
}

#[derive(Debug, Deserialize)]
pub struct SessionIdRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelGenerationResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetGenerationRequest {
    pub project_id: Uuid,
    #[serde(default)]
    pub clear_chapters: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetGenerationResponse {
    pub project_id: Uuid,
    pub cleared_sessions: usize,
    pub cleared_chapters: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsRequest {
    pub project_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PreviewContextRequest {
    pub project_id: Uuid,
    pub start_chapter: u32,
}

#[derive(Debug, Serialize)]
pub struct ContextPreviewResponse {
    pub project_id: Uuid,
    pub start_chapter: u32,
    pub end_chapter: u32,
    /// 上下文包含的小故事下标区间 [start, end)
    pub unit_start: usize,
    pub unit_end: usize,
    pub payload_chars: usize,
    pub payload: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// 开始生成（续写或从指定章节重写）
pub async fn start_generation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartGenerationRequest>,
) -> Result<Json<ApiResponse<StartGenerationResponse>>, ApiError> {
    let started = state
        .start_generation_handler
        .handle(StartGeneration {
            project_id: req.project_id,
            from_chapter: req.from_chapter,
            overwrite: req.overwrite,
        })
        .await?;

    Ok(Json(ApiResponse::success(StartGenerationResponse {
        session_id: started.session_id,
        start_chapter: started.start_chapter,
        total_chapters: started.total_chapters,
        total_batches: started.total_batches,
        discarded_chapters: started.discarded_chapters,
    })))
}

/// 取消生成
pub async fn cancel_generation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionIdRequest>,
) -> Result<Json<ApiResponse<CancelGenerationResponse>>, ApiError> {
    let cancelled = state
        .cancel_generation_handler
        .handle(CancelGeneration {
            session_id: req.session_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(CancelGenerationResponse {
        session_id: cancelled.session_id,
        status: cancelled.status.as_str().to_string(),
    })))
}

/// 查询会话状态
pub async fn generation_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionIdRequest>,
) -> Result<Json<ApiResponse<GenerationSession>>, ApiError> {
    let session = state
        .get_session_handler
        .handle(GetSession {
            session_id: req.session_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(session)))
}

/// 列出项目的全部会话（含已结束的）
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ListSessionsRequest>,
) -> Result<Json<ApiResponse<Vec<GenerationSession>>>, ApiError> {
    let sessions = state
        .list_project_sessions_handler
        .handle(ListProjectSessions {
            project_id: req.project_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(sessions)))
}

/// 重置生成状态
pub async fn reset_generation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetGenerationRequest>,
) -> Result<Json<ApiResponse<ResetGenerationResponse>>, ApiError> {
    let reset = state
        .reset_generation_handler
        .handle(ResetGeneration {
            project_id: req.project_id,
            clear_chapters: req.clear_chapters,
        })
        .await?;

    Ok(Json(ApiResponse::success(ResetGenerationResponse {
        project_id: reset.project_id,
        cleared_sessions: reset.cleared_sessions,
        cleared_chapters: reset.cleared_chapters,
    })))
}

/// 预览某批次的上下文负载
pub async fn preview_context(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewContextRequest>,
) -> Result<Json<ApiResponse<ContextPreviewResponse>>, ApiError> {
    let preview = state
        .preview_context_handler
        .handle(PreviewContext {
            project_id: req.project_id,
            start_chapter: req.start_chapter,
        })
        .await?;

    Ok(Json(ApiResponse::success(ContextPreviewResponse {
        project_id: preview.project_id,
        start_chapter: preview.start_chapter,
        end_chapter: preview.end_chapter,
        unit_start: preview.unit_range.start,
        unit_end: preview.unit_range.end,
        payload_chars: preview.payload_chars,
        payload: preview.payload,
    })))
}
