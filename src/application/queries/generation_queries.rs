//! Generation Queries

use uuid::Uuid;

/// 获取生成会话查询
#[derive(Debug, Clone)]
pub struct GetSession {
    pub session_id: String,
}

/// 列出项目的生成会话查询
#[derive(Debug, Clone)]
pub struct ListProjectSessions {
    pub project_id: Uuid,
}
