//! Project Context - 写作项目限界上下文
//!
//! 职责:
//! - 项目聚合（大纲、设定、小故事、已完成章节）
//! - 小故事到章节的映射（第 k 个小故事对应第 2k+1、2k+2 章）

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::{Project, CHAPTERS_PER_UNIT};
pub use entities::{ChapterRecord, NarrativeUnit};
pub use errors::ProjectError;
pub use value_objects::{BookName, OutlineSummary, ProjectId, StoryBible};
