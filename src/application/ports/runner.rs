//! Generation Runner Port - 后台生成任务启动

use tokio_util::sync::CancellationToken;

use crate::domain::project::Project;

/// 一次生成运行所需的全部输入
///
/// 起始章节在启动时确定并随任务传递，运行期间不再从外部重新推导
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub session_id: String,
    pub project: Project,
    pub start_chapter: u32,
    pub cancel: CancellationToken,
}

pub trait GenerationRunnerPort: Send + Sync {
    /// 在后台启动运行，立即返回
    fn launch(&self, job: GenerationJob);
}
