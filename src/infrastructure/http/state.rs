//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    AddNarrativeUnitsHandler, CancelGenerationHandler, CreateProjectHandler,
    DeleteProjectHandler, GenerateNarrativeUnitsHandler, ImportNarrativeUnitsHandler,
    ResetGenerationHandler, StartGenerationHandler,
    // Query handlers
    ExportProjectHandler, GetChaptersHandler, GetProjectHandler, GetSessionHandler,
    ListProjectSessionsHandler, ListProjectsHandler, PreviewContextHandler,
    // Ports
    ChapterExporterPort, ChapterStorePort, GenerationRunnerPort, ProjectRepositoryPort,
    SessionManagerPort, TextGeneratorPort,
};
use crate::domain::generation::ContextBuilder;
use crate::infrastructure::events::EventPublisher;

/// 应用状态
///
/// 会话管理为内存实现，项目与章节持久化在 SQLite
pub struct AppState {
    // ========== Ports ==========
    pub session_manager: Arc<dyn SessionManagerPort>,
    pub project_repo: Arc<dyn ProjectRepositoryPort>,
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub create_project_handler: CreateProjectHandler,
    pub delete_project_handler: DeleteProjectHandler,
    pub add_units_handler: AddNarrativeUnitsHandler,
    pub import_units_handler: ImportNarrativeUnitsHandler,
    pub generate_units_handler: GenerateNarrativeUnitsHandler,
    pub start_generation_handler: StartGenerationHandler,
    pub cancel_generation_handler: CancelGenerationHandler,
    pub reset_generation_handler: ResetGenerationHandler,

    // ========== Query Handlers ==========
    pub get_project_handler: GetProjectHandler,
    pub list_projects_handler: ListProjectsHandler,
    pub get_chapters_handler: GetChaptersHandler,
    pub export_project_handler: ExportProjectHandler,
    pub preview_context_handler: PreviewContextHandler,
    pub get_session_handler: GetSessionHandler,
    pub list_project_sessions_handler: ListProjectSessionsHandler,
}

impl AppState {
    /// 创建应用状态
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_manager: Arc<dyn SessionManagerPort>,
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_store: Arc<dyn ChapterStorePort>,
        exporter: Arc<dyn ChapterExporterPort>,
        runner: Arc<dyn GenerationRunnerPort>,
        generator: Arc<dyn TextGeneratorPort>,
        event_publisher: Arc<EventPublisher>,
        context_builder: ContextBuilder,
        min_units: usize,
    ) -> Self {
        Self {
            // Ports
            session_manager: session_manager.clone(),
            project_repo: project_repo.clone(),
            event_publisher,

            // Command handlers
            create_project_handler: CreateProjectHandler::new(project_repo.clone()),
            delete_project_handler: DeleteProjectHandler::new(
                project_repo.clone(),
                session_manager.clone(),
            ),
            add_units_handler: AddNarrativeUnitsHandler::new(
                project_repo.clone(),
                session_manager.clone(),
            ),
            import_units_handler: ImportNarrativeUnitsHandler::new(
                project_repo.clone(),
                session_manager.clone(),
            ),
            generate_units_handler: GenerateNarrativeUnitsHandler::new(
                project_repo.clone(),
                session_manager.clone(),
                generator,
            ),
            start_generation_handler: StartGenerationHandler::new(
                project_repo.clone(),
                chapter_store.clone(),
                session_manager.clone(),
                runner,
                min_units,
            ),
            cancel_generation_handler: CancelGenerationHandler::new(session_manager.clone()),
            reset_generation_handler: ResetGenerationHandler::new(
                project_repo.clone(),
                chapter_store,
                session_manager.clone(),
            ),

            // Query handlers
            get_project_handler: GetProjectHandler::new(
                project_repo.clone(),
                session_manager.clone(),
            ),
            list_projects_handler: ListProjectsHandler::new(project_repo.clone()),
            get_chapters_handler: GetChaptersHandler::new(project_repo.clone()),
            export_project_handler: ExportProjectHandler::new(project_repo.clone(), exporter),
            preview_context_handler: PreviewContextHandler::new(
                project_repo.clone(),
                context_builder,
            ),
            get_session_handler: GetSessionHandler::new(session_manager.clone()),
            list_project_sessions_handler: ListProjectSessionsHandler::new(session_manager),
        }
    }
}
