//! Progress Sink Port - 生命周期事件推送
//!
//! 编排器只向外推送事件，观察者不参与控制流

use serde::Serialize;

use crate::domain::generation::FormatIssue;

/// 生命周期事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LifecycleEvent {
    BatchStarted {
        batch_index: u32,
        total_batches: u32,
        start_chapter: u32,
        end_chapter: u32,
    },
    SubUnitStarted {
        chapters: Vec<u32>,
    },
    TextDelta {
        chapters: Vec<u32>,
        partial_text: String,
    },
    ChapterCompleted {
        chapter_number: u32,
        title: String,
        final_text: String,
        placeholder: bool,
    },
    FormatWarning {
        chapters: Vec<u32>,
        issues: Vec<FormatIssue>,
    },
    SubUnitFailed {
        chapters: Vec<u32>,
        reason: String,
    },
    BatchPersisted {
        batch_index: u32,
        completed_chapters: u32,
    },
    Cancelled {
        completed_chapters: u32,
    },
    Failed {
        reason: String,
    },
    AllComplete {
        total_chapters: u32,
    },
}

impl LifecycleEvent {
    /// 是否为终态事件
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::Cancelled { .. }
                | LifecycleEvent::Failed { .. }
                | LifecycleEvent::AllComplete { .. }
        )
    }
}

/// Progress Sink Port
pub trait ProgressSinkPort: Send + Sync {
    /// 推送会话事件，不得阻塞
    fn publish(&self, session_id: &str, event: LifecycleEvent);

    /// 会话开始
    fn session_opened(&self, _session_id: &str, _project_id: &str) {}

    /// 会话结束
    fn session_closed(&self, _session_id: &str, _status: &str) {}
}
