//! Generation Context - 章节批量生成的领域规则
//!
//! 职责:
//! - 批次规划（起始章节、批次大小、子单元划分）
//! - 章节标记语法与分章
//! - 衔接锚点提取
//! - 批次上下文构建与滚动记忆

mod batch;
mod chapter_markers;
mod context;
mod continuity;
mod memory;

pub use batch::{align_to_unit, BatchPlan, SubUnit, BATCH_CHAPTER_CAP, UNITS_PER_BATCH};
pub use chapter_markers::{
    find_markers, partition_chapters, ChapterMarker, FormatIssue, Partition,
    MARKER_GRAMMAR_VERSION,
};
pub use context::{truncate_with_marker, unit_window, ContextBudget, ContextBuilder, TRUNCATION_MARKER};
pub use continuity::{
    extract_anchor, extract_ending, extract_last_sentence, AnchorBounds, ContinuityAnchor,
};
pub use memory::{chapter_digest, StoryMemory, DIGEST_SNIPPET_CHARS};
