//! Chapter Exporter Port - 纯文本导出

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::project::{ChapterRecord, Project};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Nothing to export: {0}")]
    Empty(String),
}

/// 导出结果
#[derive(Debug, Clone)]
pub struct ExportedText {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// 已写入的文件路径（仅写盘时存在）
    pub path: Option<PathBuf>,
}

#[async_trait]
pub trait ChapterExporterPort: Send + Sync {
    /// 按章节号升序导出全部章节
    async fn export_as_text(
        &self,
        project: &Project,
        chapters: &BTreeMap<u32, ChapterRecord>,
    ) -> Result<ExportedText, ExportError>;
}
