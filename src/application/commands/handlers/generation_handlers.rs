//! Generation Command Handlers
//!
//! 启动时先登记会话占用项目，再从章节存储读取最新章节确定起始章节；
//! 校验失败时撤销占用，成功后把起始章节随任务交给后台运行器。

use std::sync::Arc;

use uuid::Uuid;

use crate::application::commands::{CancelGeneration, ResetGeneration, StartGeneration};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterStorePort, GenerationJob, GenerationRunnerPort, GenerationSession,
    ProjectRepositoryPort, SessionManagerPort, SessionStatus,
};
use crate::domain::generation::{align_to_unit, BatchPlan};
use crate::domain::project::{Project, ProjectId};

// ============================================================================
// StartGeneration
// ============================================================================

/// 开始生成响应
#[derive(Debug, Clone)]
pub struct StartGenerationResponse {
    pub session_id: String,
    pub start_chapter: u32,
    pub total_chapters: u32,
    pub total_batches: u32,
    /// 重写模式下删除的章节数
    pub discarded_chapters: usize,
}

pub struct StartGenerationHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_store: Arc<dyn ChapterStorePort>,
    session_manager: Arc<dyn SessionManagerPort>,
    runner: Arc<dyn GenerationRunnerPort>,
    min_units: usize,
}

impl StartGenerationHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_store: Arc<dyn ChapterStorePort>,
        session_manager: Arc<dyn SessionManagerPort>,
        runner: Arc<dyn GenerationRunnerPort>,
        min_units: usize,
    ) -> Self {
        Self {
            project_repo,
            chapter_store,
            session_manager,
            runner,
            min_units,
        }
    }

    /// 确定起始章节
    fn resolve_start(project: &Project, command: &StartGeneration) -> Result<u32, ApplicationError> {
        let total = project.total_chapters();
        match command.from_chapter {
            Some(from) => {
                project.validate_start_chapter(from)?;
                if !command.overwrite {
                    if project.has_chapters_from(from) {
                        return Err(ApplicationError::business_rule(format!(
                            "chapters from {} already exist, set overwrite to regenerate",
                            from
                        )));
                    }
                    let next = align_to_unit(project.contiguous_completed()) + 1;
                    if from > next {
                        return Err(ApplicationError::business_rule(format!(
                            "cannot continue from chapter {}: chapter {} is not generated yet",
                            from, next
                        )));
                    }
                }
                Ok(from)
            }
            None => {
                if command.overwrite {
                    return Err(ApplicationError::validation(
                        "overwrite requires from_chapter",
                    ));
                }
                let completed = align_to_unit(project.contiguous_completed());
                if completed >= total {
                    return Err(ApplicationError::business_rule(format!(
                        "all {} chapters are already generated",
                        total
                    )));
                }
                let start = completed + 1;
                if project.has_chapters_from(start) {
                    return Err(ApplicationError::business_rule(format!(
                        "project has chapters after the gap at chapter {}, regenerate from {} with overwrite",
                        start, start
                    )));
                }
                Ok(start)
            }
        }
    }

    pub async fn handle(
        &self,
        command: StartGeneration,
    ) -> Result<StartGenerationResponse, ApplicationError> {
        let project_id = ProjectId::from_uuid(command.project_id);
        let project = self
            .project_repo
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Project", command.project_id))?;

        if project.units().len() < self.min_units.max(1) {
            return Err(ApplicationError::business_rule(format!(
                "at least {} narrative unit(s) required, project has {}",
                self.min_units.max(1),
                project.units().len()
            )));
        }

        // 先占用项目，再读取章节；并发的第二次启动在这里被拒绝
        let session = GenerationSession::new(command.project_id, 0, 0, Vec::new());
        let session_id = session.id.clone();
        let cancel = self.session_manager.begin(session)?;

        let planned = match self.plan_run(project, &command, &session_id).await {
            Ok(planned) => planned,
            Err(e) => {
                let _ = self.session_manager.release(&session_id);
                return Err(e);
            }
        };
        let PlannedRun {
            project,
            start_chapter,
            total_chapters,
            total_batches,
            discarded_chapters,
        } = planned;

        if discarded_chapters > 0 {
            if let Err(e) = self
                .chapter_store
                .save_chapters(project_id, project.chapters())
                .await
            {
                let _ = self.session_manager.finish(
                    &session_id,
                    SessionStatus::Failed,
                    Some(e.to_string()),
                );
                return Err(e.into());
            }
        }

        tracing::info!(
            project_id = %project_id,
            session_id = %session_id,
            start_chapter = start_chapter,
            total_chapters = total_chapters,
            total_batches = total_batches,
            discarded_chapters = discarded_chapters,
            "Generation session started"
        );

        self.runner.launch(GenerationJob {
            session_id: session_id.clone(),
            project,
            start_chapter,
            cancel,
        });

        Ok(StartGenerationResponse {
            session_id,
            start_chapter,
            total_chapters,
            total_batches,
            discarded_chapters,
        })
    }

    /// 占用期间重新加载章节并确定本次运行的范围
    async fn plan_run(
        &self,
        mut project: Project,
        command: &StartGeneration,
        session_id: &str,
    ) -> Result<PlannedRun, ApplicationError> {
        let chapters = self.chapter_store.load_chapters(*project.id()).await?;
        project.replace_chapters(chapters);

        let start_chapter = Self::resolve_start(&project, command)?;
        let total_chapters = project.total_chapters();
        let total_batches = BatchPlan::remaining_batches(start_chapter - 1, total_chapters);

        let discarded_chapters = if command.overwrite {
            project.discard_from(start_chapter)
        } else {
            0
        };

        let completed: Vec<u32> = project.chapters().keys().copied().collect();
        self.session_manager
            .plan(session_id, start_chapter, total_batches, &completed)?;

        Ok(PlannedRun {
            project,
            start_chapter,
            total_chapters,
            total_batches,
            discarded_chapters,
        })
    }
}

struct PlannedRun {
    project: Project,
    start_chapter: u32,
    total_chapters: u32,
    total_batches: u32,
    discarded_chapters: usize,
}

// ============================================================================
// CancelGeneration
// ============================================================================

/// 取消响应
#[derive(Debug, Clone)]
pub struct CancelGenerationResponse {
    pub session_id: String,
    pub status: SessionStatus,
}

pub struct CancelGenerationHandler {
    session_manager: Arc<dyn SessionManagerPort>,
}

impl CancelGenerationHandler {
    pub fn new(session_manager: Arc<dyn SessionManagerPort>) -> Self {
        Self { session_manager }
    }

    /// 只设置取消标记，会话由运行器在下一个检查点结束
    pub async fn handle(
        &self,
        command: CancelGeneration,
    ) -> Result<CancelGenerationResponse, ApplicationError> {
        self.session_manager.cancel(&command.session_id)?;
        let session = self.session_manager.get(&command.session_id)?;

        tracing::info!(session_id = %command.session_id, "Generation cancel requested");

        Ok(CancelGenerationResponse {
            session_id: session.id,
            status: session.status,
        })
    }
}

// ============================================================================
// ResetGeneration
// ============================================================================

/// 重置响应
#[derive(Debug, Clone)]
pub struct ResetGenerationResponse {
    pub project_id: Uuid,
    pub cleared_sessions: usize,
    pub cleared_chapters: usize,
}

pub struct ResetGenerationHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_store: Arc<dyn ChapterStorePort>,
    session_manager: Arc<dyn SessionManagerPort>,
}

impl ResetGenerationHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_store: Arc<dyn ChapterStorePort>,
        session_manager: Arc<dyn SessionManagerPort>,
    ) -> Self {
        Self {
            project_repo,
            chapter_store,
            session_manager,
        }
    }

    pub async fn handle(
        &self,
        command: ResetGeneration,
    ) -> Result<ResetGenerationResponse, ApplicationError> {
        if let Some(active) = self.session_manager.active_for_project(command.project_id) {
            return Err(ApplicationError::Conflict(format!(
                "session {} is still running, cancel it before reset",
                active.id
            )));
        }

        let project_id = ProjectId::from_uuid(command.project_id);
        let mut project = self
            .project_repo
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Project", command.project_id))?;

        let mut cleared_sessions = 0;
        for session in self.session_manager.list_for_project(command.project_id) {
            if self.session_manager.clear(&session.id).is_ok() {
                cleared_sessions += 1;
            }
        }

        let cleared_chapters = if command.clear_chapters {
            let count = project.chapters().len();
            project.clear_chapters();
            self.chapter_store
                .save_chapters(project_id, project.chapters())
                .await?;
            count
        } else {
            0
        };

        tracing::info!(
            project_id = %project_id,
            cleared_sessions = cleared_sessions,
            cleared_chapters = cleared_chapters,
            "Generation state reset"
        );

        Ok(ResetGenerationResponse {
            project_id: command.project_id,
            cleared_sessions,
            cleared_chapters,
        })
    }
}
