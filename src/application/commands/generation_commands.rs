//! Generation Commands

use uuid::Uuid;

/// 开始（或续写、重写）生成命令
///
/// - `from_chapter` 为空：从已完成章节之后续写
/// - `from_chapter` + `overwrite`：删除该章及之后的全部章节后重写
#[derive(Debug, Clone)]
pub struct StartGeneration {
    pub project_id: Uuid,
    pub from_chapter: Option<u32>,
    pub overwrite: bool,
}

/// 取消生成命令
#[derive(Debug, Clone)]
pub struct CancelGeneration {
    pub session_id: String,
}

/// 重置生成状态命令
#[derive(Debug, Clone)]
pub struct ResetGeneration {
    pub project_id: Uuid,
    /// 同时清空已生成章节
    pub clear_chapters: bool,
}
