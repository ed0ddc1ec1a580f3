//! Project Query Handlers

use std::ops::Range;
use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterExporterPort, ExportedText, ProjectRepositoryPort, ProjectSummary, SessionManagerPort,
};
use crate::application::queries::{
    ExportProject, GetChapters, GetProject, ListProjects, PreviewContext,
};
use crate::domain::generation::{align_to_unit, unit_window, BatchPlan, ContextBuilder};
use crate::domain::project::{
    ChapterRecord, OutlineSummary, Project, ProjectId, StoryBible, CHAPTERS_PER_UNIT,
};

// ============================================================================
// Response DTOs
// ============================================================================

/// 小故事视图
#[derive(Debug, Clone)]
pub struct UnitView {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub body: String,
    pub group_index: u32,
    pub group_title: String,
    pub order_in_group: u32,
    pub first_chapter: u32,
    pub last_chapter: u32,
}

/// 项目详情
#[derive(Debug, Clone)]
pub struct ProjectView {
    pub id: Uuid,
    pub book_name: String,
    pub outline: OutlineSummary,
    pub bible: StoryBible,
    pub units: Vec<UnitView>,
    pub total_chapters: u32,
    pub generated_chapters: usize,
    pub placeholder_chapters: Vec<u32>,
    pub contiguous_completed: u32,
    /// 不指定起点时下一次生成的起始章节
    pub next_start_chapter: Option<u32>,
    pub active_session_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProjectView {
    fn from_project(project: &Project, active_session_id: Option<String>) -> Self {
        let units = project
            .units()
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                let first = index as u32 * CHAPTERS_PER_UNIT + 1;
                UnitView {
                    index,
                    id: unit.id().to_string(),
                    title: unit.title().to_string(),
                    body: unit.body().to_string(),
                    group_index: unit.group_index(),
                    group_title: unit.group_title().to_string(),
                    order_in_group: unit.order_in_group(),
                    first_chapter: first,
                    last_chapter: first + CHAPTERS_PER_UNIT - 1,
                }
            })
            .collect();

        let total = project.total_chapters();
        let next = align_to_unit(project.contiguous_completed()) + 1;

        Self {
            id: *project.id().as_uuid(),
            book_name: project.book_name().to_string(),
            outline: project.outline().clone(),
            bible: project.bible().clone(),
            units,
            total_chapters: total,
            generated_chapters: project.chapters().len(),
            placeholder_chapters: project
                .chapters()
                .values()
                .filter(|c| c.is_placeholder())
                .map(ChapterRecord::number)
                .collect(),
            contiguous_completed: project.contiguous_completed(),
            next_start_chapter: (next <= total).then_some(next),
            active_session_id,
            created_at: project.created_at().to_rfc3339(),
            updated_at: project.updated_at().to_rfc3339(),
        }
    }
}

/// 章节视图
#[derive(Debug, Clone)]
pub struct ChapterView {
    pub number: u32,
    pub title: String,
    pub body: String,
    pub word_count: usize,
    pub placeholder: bool,
}

impl From<&ChapterRecord> for ChapterView {
    fn from(record: &ChapterRecord) -> Self {
        Self {
            number: record.number(),
            title: record.title().to_string(),
            body: record.body().to_string(),
            word_count: record.word_count(),
            placeholder: record.is_placeholder(),
        }
    }
}

/// 上下文预览
#[derive(Debug, Clone)]
pub struct ContextPreview {
    pub project_id: Uuid,
    pub start_chapter: u32,
    pub end_chapter: u32,
    /// 上下文中包含的小故事下标
    pub unit_range: Range<usize>,
    pub payload: String,
    pub payload_chars: usize,
}

async fn load_project(
    repo: &Arc<dyn ProjectRepositoryPort>,
    project_id: Uuid,
) -> Result<Project, ApplicationError> {
    repo.find_by_id(ProjectId::from_uuid(project_id))
        .await?
        .ok_or_else(|| ApplicationError::not_found("Project", project_id))
}

// ============================================================================
// Handlers
// ============================================================================

/// GetProject Handler
pub struct GetProjectHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    session_manager: Arc<dyn SessionManagerPort>,
}

impl GetProjectHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        session_manager: Arc<dyn SessionManagerPort>,
    ) -> Self {
        Self {
            project_repo,
            session_manager,
        }
    }

    pub async fn handle(&self, query: GetProject) -> Result<ProjectView, ApplicationError> {
        let project = load_project(&self.project_repo, query.project_id).await?;
        let active = self
            .session_manager
            .active_for_project(query.project_id)
            .map(|s| s.id);
        Ok(ProjectView::from_project(&project, active))
    }
}

/// ListProjects Handler
pub struct ListProjectsHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl ListProjectsHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(&self, _query: ListProjects) -> Result<Vec<ProjectSummary>, ApplicationError> {
        Ok(self.project_repo.find_all().await?)
    }
}

/// GetChapters Handler
pub struct GetChaptersHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl GetChaptersHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(&self, query: GetChapters) -> Result<Vec<ChapterView>, ApplicationError> {
        let project = load_project(&self.project_repo, query.project_id).await?;
        let from = query.from.unwrap_or(1);
        let to = query.to.unwrap_or(u32::MAX);
        if from > to {
            return Err(ApplicationError::validation(format!(
                "invalid chapter range {}..={}",
                from, to
            )));
        }

        Ok(project
            .chapters()
            .range(from..=to)
            .map(|(_, record)| ChapterView::from(record))
            .collect())
    }
}

/// ExportProject Handler
pub struct ExportProjectHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    exporter: Arc<dyn ChapterExporterPort>,
}

impl ExportProjectHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        exporter: Arc<dyn ChapterExporterPort>,
    ) -> Self {
        Self {
            project_repo,
            exporter,
        }
    }

    pub async fn handle(&self, query: ExportProject) -> Result<ExportedText, ApplicationError> {
        let project = load_project(&self.project_repo, query.project_id).await?;
        if project.chapters().is_empty() {
            return Err(ApplicationError::business_rule("project has no chapters to export"));
        }
        Ok(self
            .exporter
            .export_as_text(&project, project.chapters())
            .await?)
    }
}

/// PreviewContext Handler
pub struct PreviewContextHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    context_builder: ContextBuilder,
}

impl PreviewContextHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>, context_builder: ContextBuilder) -> Self {
        Self {
            project_repo,
            context_builder,
        }
    }

    pub async fn handle(&self, query: PreviewContext) -> Result<ContextPreview, ApplicationError> {
        let project = load_project(&self.project_repo, query.project_id).await?;
        project.validate_start_chapter(query.start_chapter)?;

        let plan = BatchPlan::next(query.start_chapter - 1, project.total_chapters())
            .ok_or_else(|| ApplicationError::business_rule("no chapters left to plan"))?;
        let payload = self.context_builder.build(&project, plan.start_chapter);

        Ok(ContextPreview {
            project_id: query.project_id,
            start_chapter: plan.start_chapter,
            end_chapter: plan.end_chapter,
            unit_range: unit_window(plan.start_chapter, project.units().len()),
            payload_chars: payload.chars().count(),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::{BookName, NarrativeUnit};
    use crate::infrastructure::adapters::TextFileExporter;
    use crate::infrastructure::memory::InMemorySessionManager;
    use crate::application::ports::ChapterStorePort;
    use crate::infrastructure::persistence::sqlite::{
        create_test_pool, SqliteChapterStore, SqliteProjectRepository,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    async fn seeded(units: u32, chapters: u32) -> (Arc<dyn ProjectRepositoryPort>, Uuid) {
        let pool = create_test_pool().await;
        let repo: Arc<dyn ProjectRepositoryPort> =
            Arc::new(SqliteProjectRepository::new(pool.clone()));
        let store = SqliteChapterStore::new(pool);

        let project = Project::new(
            BookName::new("长夜行").unwrap(),
            OutlineSummary::default(),
            StoryBible::default(),
        );
        let id = *project.id();
        repo.save(&project).await.unwrap();

        let now = Utc::now();
        let units: Vec<NarrativeUnit> = (0..units)
            .map(|i| {
                NarrativeUnit::new(
                    format!("u{}", i),
                    format!("UNIT-{:02}", i),
                    "细纲",
                    "g1",
                    1,
                    "第一卷",
                    i + 1,
                    now,
                )
                .unwrap()
            })
            .collect();
        repo.add_units(id, &units).await.unwrap();

        let map: BTreeMap<u32, ChapterRecord> = (1..=chapters)
            .map(|n| (n, ChapterRecord::new(n, "标题", "正文")))
            .collect();
        store.save_chapters(id, &map).await.unwrap();
        (repo, *id.as_uuid())
    }

    #[tokio::test]
    async fn test_get_project_view() {
        let (repo, id) = seeded(3, 2).await;
        let handler = GetProjectHandler::new(repo, Arc::new(InMemorySessionManager::new()));

        let view = handler.handle(GetProject { project_id: id }).await.unwrap();
        assert_eq!(view.total_chapters, 6);
        assert_eq!(view.generated_chapters, 2);
        assert_eq!(view.next_start_chapter, Some(3));
        assert_eq!(view.units[2].first_chapter, 5);
        assert_eq!(view.units[2].last_chapter, 6);
        assert!(view.active_session_id.is_none());
    }

    #[tokio::test]
    async fn test_get_project_not_found() {
        let (repo, _) = seeded(1, 0).await;
        let handler = GetProjectHandler::new(repo, Arc::new(InMemorySessionManager::new()));
        let result = handler.handle(GetProject { project_id: Uuid::new_v4() }).await;
        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_chapters_range() {
        let (repo, id) = seeded(4, 6).await;
        let handler = GetChaptersHandler::new(repo);
        let chapters = handler
            .handle(GetChapters {
                project_id: id,
                from: Some(3),
                to: Some(4),
            })
            .await
            .unwrap();
        assert_eq!(chapters.iter().map(|c| c.number).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_preview_context_second_batch() {
        let (repo, id) = seeded(8, 0).await;
        let handler = PreviewContextHandler::new(repo, ContextBuilder::default());
        let preview = handler
            .handle(PreviewContext {
                project_id: id,
                start_chapter: 9,
            })
            .await
            .unwrap();
        assert_eq!(preview.end_chapter, 16);
        assert_eq!(preview.unit_range, 4..8);
        assert!(preview.payload.contains("UNIT-04"));
        assert!(!preview.payload.contains("UNIT-03"));
    }

    #[tokio::test]
    async fn test_export_requires_chapters() {
        let (repo, id) = seeded(1, 0).await;
        let handler = ExportProjectHandler::new(repo, Arc::new(TextFileExporter::new("unused", false)));
        let result = handler.handle(ExportProject { project_id: id }).await;
        assert!(matches!(result, Err(ApplicationError::BusinessRuleViolation(_))));
    }
}
