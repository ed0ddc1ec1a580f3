//! Worker Layer - Background Generation
//!
//! BatchOrchestrator 在后台任务中驱动批量章节生成

mod batch_orchestrator;
mod prompt;
mod streaming_client;

pub use batch_orchestrator::{BatchOrchestrator, BatchOrchestratorConfig, RunOutcome};
pub use prompt::SubUnitPrompt;
pub use streaming_client::{StreamingClientConfig, StreamingGenerationClient};
