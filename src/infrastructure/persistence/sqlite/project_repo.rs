//! SQLite Project Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::chapter_store::load_chapter_map;
use super::DbPool;
use crate::application::ports::{ProjectRepositoryPort, ProjectSummary, RepositoryError};
use crate::domain::project::{
    BookName, NarrativeUnit, OutlineSummary, Project, ProjectId, StoryBible,
};

/// SQLite Project Repository
pub struct SqliteProjectRepository {
    pool: DbPool,
}

impl SqliteProjectRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
        .with_timezone(&Utc))
}

fn parse_id(value: &str) -> Result<ProjectId, RepositoryError> {
    Uuid::parse_str(value)
        .map(ProjectId::from_uuid)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

#[derive(FromRow)]
struct ProjectRow {
    id: String,
    book_name: String,
    outline_json: String,
    world_setting: String,
    character_sheet: String,
    plot_outline: String,
    created_at: String,
    updated_at: String,
}

#[derive(FromRow)]
struct UnitRow {
    id: String,
    title: String,
    body: String,
    parent_group_id: String,
    group_index: i64,
    group_title: String,
    order_in_group: i64,
    created_at: String,
}

impl TryFrom<UnitRow> for NarrativeUnit {
    type Error = RepositoryError;

    fn try_from(row: UnitRow) -> Result<Self, Self::Error> {
        NarrativeUnit::new(
            row.id,
            row.title,
            row.body,
            row.parent_group_id,
            row.group_index as u32,
            row.group_title,
            row.order_in_group as u32,
            parse_time(&row.created_at)?,
        )
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: String,
    book_name: String,
    unit_count: i64,
    chapter_count: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SummaryRow> for ProjectSummary {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(ProjectSummary {
            id: parse_id(&row.id)?,
            book_name: row.book_name,
            unit_count: row.unit_count as u32,
            chapter_count: row.chapter_count as u32,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl ProjectRepositoryPort for SqliteProjectRepository {
    async fn save(&self, project: &Project) -> Result<(), RepositoryError> {
        let outline_json = serde_json::to_string(project.outline())
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let bible = project.bible();

        sqlx::query(
            r#"
            INSERT INTO projects (id, book_name, outline_json, world_setting, character_sheet, plot_outline, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                book_name = excluded.book_name,
                outline_json = excluded.outline_json,
                world_setting = excluded.world_setting,
                character_sheet = excluded.character_sheet,
                plot_outline = excluded.plot_outline,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(project.id().to_string())
        .bind(project.book_name().as_str())
        .bind(outline_json)
        .bind(&bible.world_setting)
        .bind(&bible.character_sheet)
        .bind(&bible.plot_outline)
        .bind(project.created_at().to_rfc3339())
        .bind(project.updated_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT id, book_name, outline_json, world_setting, character_sheet, plot_outline, created_at, updated_at FROM projects WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let unit_rows: Vec<UnitRow> = sqlx::query_as(
            r#"
            SELECT id, title, body, parent_group_id, group_index, group_title, order_in_group, created_at
            FROM narrative_units WHERE project_id = ?
            ORDER BY group_index, order_in_group, created_at
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let units = unit_rows
            .into_iter()
            .map(NarrativeUnit::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let chapters = load_chapter_map(&self.pool, id).await?;

        let outline: OutlineSummary = serde_json::from_str(&row.outline_json)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let book_name = BookName::new(row.book_name)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        Ok(Some(Project::restore(
            parse_id(&row.id)?,
            book_name,
            outline,
            StoryBible {
                world_setting: row.world_setting,
                character_sheet: row.character_sheet,
                plot_outline: row.plot_outline,
            },
            units,
            chapters.into_values().collect(),
            parse_time(&row.created_at)?,
            parse_time(&row.updated_at)?,
        )))
    }

    async fn find_all(&self) -> Result<Vec<ProjectSummary>, RepositoryError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.book_name, p.created_at, p.updated_at,
                (SELECT COUNT(*) FROM narrative_units u WHERE u.project_id = p.id) AS unit_count,
                (SELECT COUNT(*) FROM chapters c WHERE c.project_id = p.id) AS chapter_count
            FROM projects p
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ProjectSummary::try_from).collect()
    }

    async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError> {
        // 使用事务确保原子性
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        for sql in [
            "DELETE FROM chapters WHERE project_id = ?",
            "DELETE FROM narrative_units WHERE project_id = ?",
            "DELETE FROM projects WHERE id = ?",
        ] {
            sqlx::query(sql)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn add_units(
        &self,
        id: ProjectId,
        units: &[NarrativeUnit],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        for unit in units {
            sqlx::query(
                r#"
                INSERT INTO narrative_units (id, project_id, title, body, parent_group_id, group_index, group_title, order_in_group, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(unit.id())
            .bind(id.to_string())
            .bind(unit.title())
            .bind(unit.body())
            .bind(unit.parent_group_id())
            .bind(unit.group_index() as i64)
            .bind(unit.group_title())
            .bind(unit.order_in_group() as i64)
            .bind(unit.created_at().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::Duplicate(unit.id().to_string())
                }
                other => RepositoryError::DatabaseError(other.to_string()),
            })?;
        }

        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
