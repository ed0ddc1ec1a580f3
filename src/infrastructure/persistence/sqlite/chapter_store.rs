//! SQLite Chapter Store
//!
//! 每次保存都以完整章节表整体替换项目的已存章节

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{ChapterStorePort, RepositoryError};
use crate::domain::project::{ChapterRecord, ProjectId};

/// SQLite Chapter Store
pub struct SqliteChapterStore {
    pool: DbPool,
}

impl SqliteChapterStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ChapterRow {
    number: i64,
    title: String,
    body: String,
    placeholder: i64,
}

impl TryFrom<ChapterRow> for ChapterRecord {
    type Error = RepositoryError;

    fn try_from(row: ChapterRow) -> Result<Self, Self::Error> {
        let number = u32::try_from(row.number)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        Ok(ChapterRecord::restore(
            number,
            row.title,
            row.body,
            row.placeholder != 0,
        ))
    }
}

/// 读取项目的全部章节
pub(super) async fn load_chapter_map(
    pool: &DbPool,
    project_id: ProjectId,
) -> Result<BTreeMap<u32, ChapterRecord>, RepositoryError> {
    let rows: Vec<ChapterRow> = sqlx::query_as(
        "SELECT number, title, body, placeholder FROM chapters WHERE project_id = ? ORDER BY number",
    )
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await
    .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

    rows.into_iter()
        .map(|row| ChapterRecord::try_from(row).map(|c| (c.number(), c)))
        .collect()
}

#[async_trait]
impl ChapterStorePort for SqliteChapterStore {
    async fn save_chapters(
        &self,
        project_id: ProjectId,
        chapters: &BTreeMap<u32, ChapterRecord>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM chapters WHERE project_id = ?")
            .bind(project_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        for chapter in chapters.values() {
            sqlx::query(
                r#"
                INSERT INTO chapters (project_id, number, title, body, placeholder, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project_id.to_string())
            .bind(chapter.number() as i64)
            .bind(chapter.title())
            .bind(chapter.body())
            .bind(chapter.is_placeholder() as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(
            project_id = %project_id,
            chapters = chapters.len(),
            "Chapters saved"
        );

        Ok(())
    }

    async fn load_chapters(
        &self,
        project_id: ProjectId,
    ) -> Result<BTreeMap<u32, ChapterRecord>, RepositoryError> {
        load_chapter_map(&self.pool, project_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::create_test_pool;

    fn map(numbers: &[u32]) -> BTreeMap<u32, ChapterRecord> {
        numbers
            .iter()
            .map(|n| (*n, ChapterRecord::new(*n, format!("标题{}", n), format!("正文{}", n))))
            .collect()
    }

    #[tokio::test]
    async fn test_save_replaces_full_map() {
        let store = SqliteChapterStore::new(create_test_pool().await);
        let project_id = ProjectId::new();

        store.save_chapters(project_id, &map(&[1, 2, 3, 4])).await.unwrap();
        store.save_chapters(project_id, &map(&[1, 2])).await.unwrap();

        let loaded = store.load_chapters(project_id).await.unwrap();
        assert_eq!(loaded.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(loaded[&2].body(), "正文2");
    }

    #[tokio::test]
    async fn test_placeholder_flag_round_trips() {
        let store = SqliteChapterStore::new(create_test_pool().await);
        let project_id = ProjectId::new();
        let mut chapters = map(&[1]);
        chapters.insert(2, ChapterRecord::placeholder(2));

        store.save_chapters(project_id, &chapters).await.unwrap();

        let loaded = store.load_chapters(project_id).await.unwrap();
        assert!(loaded[&2].is_placeholder());
        assert!(!loaded[&1].is_placeholder());
    }

    #[tokio::test]
    async fn test_projects_are_isolated() {
        let store = SqliteChapterStore::new(create_test_pool().await);
        let a = ProjectId::new();
        let b = ProjectId::new();
        store.save_chapters(a, &map(&[1, 2])).await.unwrap();
        store.save_chapters(b, &map(&[1])).await.unwrap();
        assert_eq!(store.load_chapters(a).await.unwrap().len(), 2);
        assert_eq!(store.load_chapters(b).await.unwrap().len(), 1);
    }
}
