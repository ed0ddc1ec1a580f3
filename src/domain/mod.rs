//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Project Context: 写作项目（大纲、设定、小故事、章节）
//! - Generation Context: 批次规划、分章、衔接与上下文构建

pub mod generation;
pub mod project;

pub mod breakdown;
pub mod text_utils;
