//! Session Manager Port - 生成会话生命周期管理
//!
//! 定义会话管理的抽象接口，具体实现在 infrastructure/memory 层

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Session Manager 错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Project {project_id} already has an active session: {session_id}")]
    AlreadyActive { project_id: Uuid, session_id: String },

    #[error("Session is still running: {0}")]
    NotTerminal(String),

    #[error("Session already finished: {0}")]
    AlreadyFinished(String),
}

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Streaming => "streaming",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::Failed
        )
    }
}

/// 生成会话（in-memory）
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSession {
    pub id: String,
    pub project_id: Uuid,
    pub status: SessionStatus,
    /// 本次运行的起始章节
    pub start_chapter: u32,
    /// 当前批次（1 起，0 表示尚未开始）
    pub current_batch: u32,
    pub total_batches: u32,
    /// 已完成章节号（含本次运行之前已存在的章节）
    pub completed_chapter_numbers: BTreeSet<u32>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationSession {
    pub fn new(
        project_id: Uuid,
        start_chapter: u32,
        total_batches: u32,
        completed: impl IntoIterator<Item = u32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            project_id,
            status: SessionStatus::Pending,
            start_chapter,
            current_batch: 0,
            total_batches,
            completed_chapter_numbers: completed.into_iter().collect(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Session Manager Port
///
/// 同一项目同时至多一个活动会话；活动会话结束前再次开始会被拒绝
pub trait SessionManagerPort: Send + Sync {
    /// 登记新会话，返回其取消令牌
    fn begin(&self, session: GenerationSession) -> Result<CancellationToken, SessionError>;

    /// 填写预占会话的运行计划（起始章节、批次数、已有章节）
    fn plan(
        &self,
        id: &str,
        start_chapter: u32,
        total_batches: u32,
        completed: &[u32],
    ) -> Result<(), SessionError>;

    /// 撤销尚未启动的预占会话，不留下记录
    fn release(&self, id: &str) -> Result<(), SessionError>;

    /// 获取会话快照
    fn get(&self, id: &str) -> Result<GenerationSession, SessionError>;

    /// 项目当前的活动会话
    fn active_for_project(&self, project_id: Uuid) -> Option<GenerationSession>;

    /// 更新状态（非终态）
    fn set_status(&self, id: &str, status: SessionStatus) -> Result<(), SessionError>;

    /// 更新当前批次
    fn set_batch(&self, id: &str, current_batch: u32) -> Result<(), SessionError>;

    /// 记录已完成章节
    fn record_completed(&self, id: &str, chapters: &[u32]) -> Result<(), SessionError>;

    /// 进入终态并释放项目占用
    fn finish(
        &self,
        id: &str,
        status: SessionStatus,
        error: Option<String>,
    ) -> Result<(), SessionError>;

    /// 请求取消（协作式）
    fn cancel(&self, id: &str) -> Result<(), SessionError>;

    /// 清除已结束的会话
    fn clear(&self, id: &str) -> Result<(), SessionError>;

    /// 项目的全部会话（含已结束）
    fn list_for_project(&self, project_id: Uuid) -> Vec<GenerationSession>;

    /// 获取所有会话 ID
    fn list_all(&self) -> Vec<String>;
}
