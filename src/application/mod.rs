//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TextGenerator、Repository、SessionManager、ProgressSink 等）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Project commands
    AddNarrativeUnits,
    CreateProject,
    DeleteProject,
    GenerateNarrativeUnits,
    ImportNarrativeUnits,
    NewNarrativeUnit,
    // Generation commands
    CancelGeneration,
    ResetGeneration,
    StartGeneration,
    // Handlers
    handlers::{
        AddNarrativeUnitsHandler, AddUnitsResponse, CancelGenerationHandler,
        CancelGenerationResponse, CreateProjectHandler, CreateProjectResponse,
        DeleteProjectHandler, GenerateNarrativeUnitsHandler, ImportNarrativeUnitsHandler,
        ResetGenerationHandler,
        ResetGenerationResponse, StartGenerationHandler, StartGenerationResponse,
    },
};

pub use error::ApplicationError;

pub use ports::{
    // Exporter
    ChapterExporterPort,
    ExportError,
    ExportedText,
    // Progress
    LifecycleEvent,
    ProgressSinkPort,
    // Repositories
    ChapterStorePort,
    ProjectRepositoryPort,
    ProjectSummary,
    RepositoryError,
    // Runner
    GenerationJob,
    GenerationRunnerPort,
    // Session manager
    GenerationSession,
    SessionError,
    SessionManagerPort,
    SessionStatus,
    // Text generator
    ChatMessage,
    ChatRole,
    GenerationError,
    TextDeltaStream,
    TextGeneratorPort,
};

pub use queries::{
    // Project queries
    ExportProject,
    GetChapters,
    GetProject,
    ListProjects,
    PreviewContext,
    // Generation queries
    GetSession,
    ListProjectSessions,
    // Handlers
    handlers::{
        ChapterView, ContextPreview, ExportProjectHandler, GetChaptersHandler,
        GetProjectHandler, GetSessionHandler, ListProjectSessionsHandler, ListProjectsHandler,
        PreviewContextHandler, ProjectView, UnitView,
    },
};
