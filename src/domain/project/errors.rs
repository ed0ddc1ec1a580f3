//! Project Context - Errors

use thiserror::Error;

use super::ProjectId;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("项目不存在: {0}")]
    NotFound(ProjectId),

    #[error("无效的书名: {0}")]
    InvalidBookName(String),

    #[error("无效的小故事: {0}")]
    InvalidUnit(String),

    #[error("章节号超出范围: 第{number}章（共{total}章）")]
    ChapterOutOfRange { number: u32, total: u32 },

    #[error("起始章节必须是小故事的第一章: 第{0}章")]
    MisalignedChapter(u32),

    #[error("小故事「{0}」会排在已生成章节的小故事之前")]
    InsertBeforeGenerated(String),
}
