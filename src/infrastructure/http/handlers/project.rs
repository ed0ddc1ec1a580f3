//! Project HTTP Handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{
    AddNarrativeUnits, AddUnitsResponse, ChapterView, CreateProject, DeleteProject,
    ExportProject, GenerateNarrativeUnits, GetChapters, GetProject, ImportNarrativeUnits,
    ListProjects,
    NewNarrativeUnit, ProjectSummary, ProjectView, UnitView,
};
use crate::domain::project::{OutlineSummary, StoryBible};
use crate::infrastructure::http::dto::{ApiResponse, Empty};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub book_name: String,
    #[serde(default)]
    pub outline: OutlineSummary,
    #[serde(default)]
    pub bible: StoryBible,
}

#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub id: Uuid,
    pub book_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectIdRequest {
    pub project_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GetChaptersRequest {
    pub project_id: Uuid,
    #[serde(default)]
    pub from: Option<u32>,
    #[serde(default)]
    pub to: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UnitRequest {
    pub title: String,
    pub body: String,
    pub group_id: String,
    #[serde(default)]
    pub group_index: u32,
    #[serde(default)]
    pub group_title: String,
    #[serde(default)]
    pub order_in_group: u32,
}

#[derive(Debug, Deserialize)]
pub struct AddUnitsRequest {
    pub project_id: Uuid,
    pub units: Vec<UnitRequest>,
}

/// 细纲文本导入：按 "小故事N：标题" 拆分
#[derive(Debug, Deserialize)]
pub struct ImportUnitsRequest {
    pub project_id: Uuid,
    pub group_id: String,
    #[serde(default)]
    pub group_index: u32,
    #[serde(default)]
    pub group_title: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateUnitsRequest {
    pub project_id: Uuid,
    pub group_id: String,
    #[serde(default)]
    pub group_index: u32,
    #[serde(default)]
    pub group_title: String,
    pub macro_story: String,
    #[serde(default)]
    pub unit_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UnitsChangedResponse {
    pub project_id: Uuid,
    pub added: usize,
    pub total_units: usize,
    pub total_chapters: u32,
}

impl From<AddUnitsResponse> for UnitsChangedResponse {
    fn from(r: AddUnitsResponse) -> Self {
        Self {
            project_id: r.project_id,
            added: r.added,
            total_units: r.total_units,
            total_chapters: r.total_chapters,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnitResponse {
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

impl From<UnitView> for UnitResponse {
    fn from(v: UnitView) -> Self {
        Self {
            index: v.index,
            id: v.id,
            title: v.title,
            body: v.body,
            group_index: v.group_index,
            group_title: v.group_title,
            order_in_group: v.order_in_group,
            first_chapter: v.first_chapter,
            last_chapter: v.last_chapter,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub book_name: String,
    pub outline: OutlineSummary,
    pub bible: StoryBible,
    pub units: Vec<UnitResponse>,
    pub total_chapters: u32,
    pub generated_chapters: usize,
    pub placeholder_chapters: Vec<u32>,
    pub contiguous_completed: u32,
    pub next_start_chapter: Option<u32>,
    pub active_session_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProjectView> for ProjectResponse {
    fn from(v: ProjectView) -> Self {
        Self {
            id: v.id,
            book_name: v.book_name,
            outline: v.outline,
            bible: v.bible,
            units: v.units.into_iter().map(UnitResponse::from).collect(),
            total_chapters: v.total_chapters,
            generated_chapters: v.generated_chapters,
            placeholder_chapters: v.placeholder_chapters,
            contiguous_completed: v.contiguous_completed,
            next_start_chapter: v.next_start_chapter,
            active_session_id: v.active_session_id,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectSummaryResponse {
    pub id: Uuid,
    pub book_name: String,
    pub unit_count: u32,
    pub chapter_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProjectSummary> for ProjectSummaryResponse {
    fn from(s: ProjectSummary) -> Self {
        Self {
            id: *s.id.as_uuid(),
            book_name: s.book_name,
            unit_count: s.unit_count,
            chapter_count: s.chapter_count,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChapterResponse {
    pub number: u32,
    pub title: String,
    pub body: String,
    pub word_count: usize,
    pub placeholder: bool,
}

impl From<ChapterView> for ChapterResponse {
    fn from(v: ChapterView) -> Self {
        Self {
            number: v.number,
            title: v.title,
            body: v.body,
            word_count: v.word_count,
            placeholder: v.placeholder,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChaptersResponse {
    pub project_id: Uuid,
    pub total: usize,
    pub chapters: Vec<ChapterResponse>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub file_name: String,
    pub path: Option<String>,
    pub content: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// 创建项目
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<ApiResponse<CreateProjectResponse>>, ApiError> {
    let command = CreateProject {
        book_name: req.book_name,
        outline: req.outline,
        bible: req.bible,
    };
    let created = state.create_project_handler.handle(command).await?;

    Ok(Json(ApiResponse::success(CreateProjectResponse {
        id: created.id,
        book_name: created.book_name,
    })))
}

/// 获取项目详情
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProjectIdRequest>,
) -> Result<Json<ApiResponse<ProjectResponse>>, ApiError> {
    let view = state
        .get_project_handler
        .handle(GetProject {
            project_id: req.project_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(view.into())))
}

/// 列出所有项目
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ProjectSummaryResponse>>>, ApiError> {
    let summaries = state.list_projects_handler.handle(ListProjects).await?;

    Ok(Json(ApiResponse::success(
        summaries.into_iter().map(ProjectSummaryResponse::from).collect(),
    )))
}

/// 删除项目（存在活动会话时拒绝）
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProjectIdRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_project_handler
        .handle(DeleteProject {
            project_id: req.project_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// 获取章节正文
pub async fn get_chapters(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetChaptersRequest>,
) -> Result<Json<ApiResponse<ChaptersResponse>>, ApiError> {
    let chapters = state
        .get_chapters_handler
        .handle(GetChapters {
            project_id: req.project_id,
            from: req.from,
            to: req.to,
        })
        .await?;

    let chapters: Vec<ChapterResponse> = chapters.into_iter().map(ChapterResponse::from).collect();
    Ok(Json(ApiResponse::success(ChaptersResponse {
        project_id: req.project_id,
        total: chapters.len(),
        chapters,
    })))
}

/// 导出纯文本
pub async fn export_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProjectIdRequest>,
) -> Result<Json<ApiResponse<ExportResponse>>, ApiError> {
    let exported = state
        .export_project_handler
        .handle(ExportProject {
            project_id: req.project_id,
        })
        .await?;

    let content = String::from_utf8(exported.bytes)
        .map_err(|e| ApiError::Internal(format!("Exported text is not UTF-8: {}", e)))?;

    Ok(Json(ApiResponse::success(ExportResponse {
        file_name: exported.file_name,
        path: exported.path.map(|p| p.display().to_string()),
        content,
    })))
}

/// 追加结构化小故事
pub async fn add_units(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddUnitsRequest>,
) -> Result<Json<ApiResponse<UnitsChangedResponse>>, ApiError> {
    let units = req
        .units
        .into_iter()
        .map(|u| NewNarrativeUnit {
            title: u.title,
            body: u.body,
            group_id: u.group_id,
            group_index: u.group_index,
            group_title: u.group_title,
            order_in_group: u.order_in_group,
        })
        .collect();

    let response = state
        .add_units_handler
        .handle(AddNarrativeUnits {
            project_id: req.project_id,
            units,
        })
        .await?;

    Ok(Json(ApiResponse::success(response.into())))
}

/// 从细纲文本导入小故事
pub async fn import_units(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportUnitsRequest>,
) -> Result<Json<ApiResponse<UnitsChangedResponse>>, ApiError> {
    let response = state
        .import_units_handler
        .handle(ImportNarrativeUnits {
            project_id: req.project_id,
            group_id: req.group_id,
            group_index: req.group_index,
            group_title: req.group_title,
            text: req.text,
        })
        .await?;

    Ok(Json(ApiResponse::success(response.into())))
}

/// 由模型拆分中故事并追加生成的小故事
pub async fn generate_units(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateUnitsRequest>,
) -> Result<Json<ApiResponse<UnitsChangedResponse>>, ApiError> {
    let response = state
        .generate_units_handler
        .handle(GenerateNarrativeUnits {
            project_id: req.project_id,
            group_id: req.group_id,
            group_index: req.group_index,
            group_title: req.group_title,
            macro_story: req.macro_story,
            unit_count: req.unit_count,
        })
        .await?;

    Ok(Json(ApiResponse::success(response.into())))
}
