//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite）

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::project::{ChapterRecord, NarrativeUnit, Project, ProjectId};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Project Repository
// ============================================================================

/// 项目列表摘要
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub book_name: String,
    pub unit_count: u32,
    pub chapter_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project Repository Port
#[async_trait]
pub trait ProjectRepositoryPort: Send + Sync {
    /// 保存项目基本信息（不含小故事与章节）
    async fn save(&self, project: &Project) -> Result<(), RepositoryError>;

    /// 加载完整项目（含小故事与章节）
    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError>;

    /// 获取所有项目摘要
    async fn find_all(&self) -> Result<Vec<ProjectSummary>, RepositoryError>;

    /// 删除项目及其小故事、章节
    async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError>;

    /// 追加小故事
    async fn add_units(
        &self,
        id: ProjectId,
        units: &[NarrativeUnit],
    ) -> Result<(), RepositoryError>;
}

// ============================================================================
// Chapter Store
// ============================================================================

/// Chapter Store Port
///
/// 每次保存都接收完整的章节表，存储内容被整体替换为该表
#[async_trait]
pub trait ChapterStorePort: Send + Sync {
    async fn save_chapters(
        &self,
        project_id: ProjectId,
        chapters: &BTreeMap<u32, ChapterRecord>,
    ) -> Result<(), RepositoryError>;

    async fn load_chapters(
        &self,
        project_id: ProjectId,
    ) -> Result<BTreeMap<u32, ChapterRecord>, RepositoryError>;
}
