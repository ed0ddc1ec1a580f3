//! Project Commands

use uuid::Uuid;

use crate::domain::project::{OutlineSummary, StoryBible};

/// 创建项目命令
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub book_name: String,
    pub outline: OutlineSummary,
    pub bible: StoryBible,
}

/// 新小故事
#[derive(Debug, Clone)]
pub struct NewNarrativeUnit {
    pub title: String,
    pub body: String,
    pub group_id: String,
    pub group_index: u32,
    pub group_title: String,
    pub order_in_group: u32,
}

/// 追加结构化小故事命令
#[derive(Debug, Clone)]
pub struct AddNarrativeUnits {
    pub project_id: Uuid,
    pub units: Vec<NewNarrativeUnit>,
}

/// 从细纲文本导入小故事命令
#[derive(Debug, Clone)]
pub struct ImportNarrativeUnits {
    pub project_id: Uuid,
    pub group_id: String,
    pub group_index: u32,
    pub group_title: String,
    pub text: String,
}

/// 由模型拆分中故事生成小故事命令
#[derive(Debug, Clone)]
pub struct GenerateNarrativeUnits {
    pub project_id: Uuid,
    pub group_id: String,
    pub group_index: u32,
    pub group_title: String,
    pub macro_story: String,
    /// 为空时使用默认数量
    pub unit_count: Option<u32>,
}

/// 删除项目命令
#[derive(Debug, Clone)]
pub struct DeleteProject {
    pub project_id: Uuid,
}
