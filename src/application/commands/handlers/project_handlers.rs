//! Project Command Handlers

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::application::commands::{
    AddNarrativeUnits, CreateProject, DeleteProject, GenerateNarrativeUnits,
    ImportNarrativeUnits,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChatMessage, ProjectRepositoryPort, SessionManagerPort, TextGeneratorPort,
};
use crate::domain::breakdown::{
    breakdown_prompt, parse_micro_stories, UnitGroup, DEFAULT_BREAKDOWN_UNITS,
};
use crate::domain::project::{BookName, NarrativeUnit, Project, ProjectError, ProjectId};

// ============================================================================
// CreateProject
// ============================================================================

/// 创建项目响应
#[derive(Debug, Clone)]
pub struct CreateProjectResponse {
    pub id: Uuid,
    pub book_name: String,
}

pub struct CreateProjectHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl CreateProjectHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(
        &self,
        command: CreateProject,
    ) -> Result<CreateProjectResponse, ApplicationError> {
        let book_name = BookName::new(command.book_name)
            .map_err(|e| ProjectError::InvalidBookName(e.to_string()))?;
        let project = Project::new(book_name, command.outline, command.bible);

        self.project_repo.save(&project).await?;

        tracing::info!(
            project_id = %project.id(),
            book_name = %project.book_name(),
            "Project created"
        );

        Ok(CreateProjectResponse {
            id: *project.id().as_uuid(),
            book_name: project.book_name().to_string(),
        })
    }
}

// ============================================================================
// AddNarrativeUnits / ImportNarrativeUnits / GenerateNarrativeUnits
// ============================================================================

/// 追加小故事响应
#[derive(Debug, Clone)]
pub struct AddUnitsResponse {
    pub project_id: Uuid,
    pub added: usize,
    pub total_units: usize,
    pub total_chapters: u32,
}

/// 生成进行中的项目不接受新小故事
fn ensure_idle(
    session_manager: &dyn SessionManagerPort,
    project_id: Uuid,
) -> Result<(), ApplicationError> {
    match session_manager.active_for_project(project_id) {
        Some(active) => Err(ApplicationError::Conflict(format!(
            "project {} has an active generation session {}, wait for it before adding units",
            project_id, active.id
        ))),
        None => Ok(()),
    }
}

/// 加载项目、校验并写入新小故事
async fn append_units(
    project_repo: &dyn ProjectRepositoryPort,
    session_manager: &dyn SessionManagerPort,
    project_id: Uuid,
    units: Vec<NarrativeUnit>,
) -> Result<AddUnitsResponse, ApplicationError> {
    ensure_idle(session_manager, project_id)?;

    let id = ProjectId::from_uuid(project_id);
    let mut project = project_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Project", project_id))?;

    let added = units.len();
    project.add_units(units.clone())?;
    project_repo.add_units(id, &units).await?;

    tracing::info!(
        project_id = %project_id,
        added = added,
        total_units = project.units().len(),
        "Narrative units added"
    );

    Ok(AddUnitsResponse {
        project_id,
        added,
        total_units: project.units().len(),
        total_chapters: project.total_chapters(),
    })
}

pub struct AddNarrativeUnitsHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    session_manager: Arc<dyn SessionManagerPort>,
}

impl AddNarrativeUnitsHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        session_manager: Arc<dyn SessionManagerPort>,
    ) -> Self {
        Self {
            project_repo,
            session_manager,
        }
    }

    pub async fn handle(
        &self,
        command: AddNarrativeUnits,
    ) -> Result<AddUnitsResponse, ApplicationError> {
        if command.units.is_empty() {
            return Err(ApplicationError::validation("units cannot be empty"));
        }

        // 同一批次内按提交顺序递增创建时间，保证排序稳定
        let base_time = Utc::now();
        let units = command
            .units
            .into_iter()
            .enumerate()
            .map(|(i, unit)| {
                NarrativeUnit::new(
                    format!("micro_{}_{}", unit.group_index, Uuid::new_v4().simple()),
                    unit.title,
                    unit.body,
                    unit.group_id,
                    unit.group_index,
                    unit.group_title,
                    unit.order_in_group,
                    base_time + Duration::milliseconds(i as i64),
                )
                .map_err(|e| ProjectError::InvalidUnit(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        append_units(
            self.project_repo.as_ref(),
            self.session_manager.as_ref(),
            command.project_id,
            units,
        )
        .await
    }
}

pub struct ImportNarrativeUnitsHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    session_manager: Arc<dyn SessionManagerPort>,
}

impl ImportNarrativeUnitsHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        session_manager: Arc<dyn SessionManagerPort>,
    ) -> Self {
        Self {
            project_repo,
            session_manager,
        }
    }

    pub async fn handle(
        &self,
        command: ImportNarrativeUnits,
    ) -> Result<AddUnitsResponse, ApplicationError> {
        let group = UnitGroup {
            id: command.group_id,
            index: command.group_index,
            title: command.group_title,
        };
        let units = parse_micro_stories(&command.text, &group);
        if units.is_empty() {
            return Err(ApplicationError::validation(
                "no micro-story headings found in breakdown text",
            ));
        }

        append_units(
            self.project_repo.as_ref(),
            self.session_manager.as_ref(),
            command.project_id,
            units,
        )
        .await
    }
}

pub struct GenerateNarrativeUnitsHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    session_manager: Arc<dyn SessionManagerPort>,
    generator: Arc<dyn TextGeneratorPort>,
}

impl GenerateNarrativeUnitsHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        session_manager: Arc<dyn SessionManagerPort>,
        generator: Arc<dyn TextGeneratorPort>,
    ) -> Self {
        Self {
            project_repo,
            session_manager,
            generator,
        }
    }

    pub async fn handle(
        &self,
        command: GenerateNarrativeUnits,
    ) -> Result<AddUnitsResponse, ApplicationError> {
        if command.macro_story.trim().is_empty() {
            return Err(ApplicationError::validation("macro_story cannot be empty"));
        }
        let unit_count = command.unit_count.unwrap_or(DEFAULT_BREAKDOWN_UNITS);
        if unit_count == 0 {
            return Err(ApplicationError::validation("unit_count must be at least 1"));
        }
        ensure_idle(self.session_manager.as_ref(), command.project_id)?;

        let project = self
            .project_repo
            .find_by_id(ProjectId::from_uuid(command.project_id))
            .await?
            .ok_or_else(|| ApplicationError::not_found("Project", command.project_id))?;

        let group = UnitGroup {
            id: command.group_id,
            index: command.group_index,
            title: command.group_title,
        };
        let prompt = breakdown_prompt(
            &command.macro_story,
            &group,
            unit_count,
            project.total_chapters() + 1,
        );

        tracing::info!(
            project_id = %command.project_id,
            group_index = group.index,
            unit_count = unit_count,
            "Generating narrative units"
        );

        let reply = self
            .generator
            .chat(vec![
                ChatMessage::system("你是一位擅长长篇连载结构设计的网络小说策划。"),
                ChatMessage::user(prompt),
            ])
            .await?;

        let units = parse_micro_stories(&reply, &group);
        if units.is_empty() {
            return Err(ApplicationError::ExternalServiceError(
                "model reply contained no micro-story headings".to_string(),
            ));
        }
        if units.len() as u32 != unit_count {
            tracing::warn!(
                project_id = %command.project_id,
                requested = unit_count,
                parsed = units.len(),
                "Model returned a different number of narrative units"
            );
        }

        append_units(
            self.project_repo.as_ref(),
            self.session_manager.as_ref(),
            command.project_id,
            units,
        )
        .await
    }
}

// ============================================================================
// DeleteProject
// ============================================================================

pub struct DeleteProjectHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    session_manager: Arc<dyn SessionManagerPort>,
}

impl DeleteProjectHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        session_manager: Arc<dyn SessionManagerPort>,
    ) -> Self {
        Self {
            project_repo,
            session_manager,
        }
    }

    pub async fn handle(&self, command: DeleteProject) -> Result<(), ApplicationError> {
        let project_id = command.project_id;

        if let Some(active) = self.session_manager.active_for_project(project_id) {
            return Err(ApplicationError::Conflict(format!(
                "project {} has an active generation session {}",
                project_id, active.id
            )));
        }

        let project = self
            .project_repo
            .find_by_id(ProjectId::from_uuid(project_id))
            .await?
            .ok_or_else(|| ApplicationError::not_found("Project", project_id))?;

        self.project_repo.delete(*project.id()).await?;

        for session in self.session_manager.list_for_project(project_id) {
            let _ = self.session_manager.clear(&session.id);
        }

        tracing::info!(
            project_id = %project_id,
            book_name = %project.book_name(),
            "Project deleted"
        );

        Ok(())
    }
}
