//! Project Queries

use uuid::Uuid;

/// 获取项目详情查询
#[derive(Debug, Clone)]
pub struct GetProject {
    pub project_id: Uuid,
}

/// 列出所有项目查询
#[derive(Debug, Clone)]
pub struct ListProjects;

/// 获取章节查询，区间为闭区间，缺省表示不限
#[derive(Debug, Clone)]
pub struct GetChapters {
    pub project_id: Uuid,
    pub from: Option<u32>,
    pub to: Option<u32>,
}

/// 导出纯文本查询
#[derive(Debug, Clone)]
pub struct ExportProject {
    pub project_id: Uuid,
}

/// 预览某批次发送给生成后端的上下文
#[derive(Debug, Clone)]
pub struct PreviewContext {
    pub project_id: Uuid,
    pub start_chapter: u32,
}
