//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod exporter;
mod progress;
mod repositories;
mod runner;
mod session_manager;
mod text_generator;

pub use exporter::{ChapterExporterPort, ExportError, ExportedText};
pub use progress::{LifecycleEvent, ProgressSinkPort};
pub use repositories::{ChapterStorePort, ProjectRepositoryPort, ProjectSummary, RepositoryError};
pub use runner::{GenerationJob, GenerationRunnerPort};
pub use session_manager::{GenerationSession, SessionError, SessionManagerPort, SessionStatus};
pub use text_generator::{
    ChatMessage, ChatRole, GenerationError, TextDeltaStream, TextGeneratorPort,
};
