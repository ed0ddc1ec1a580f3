//! ChapterForge - 长篇小说章节批量生成服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Project Context: 写作项目（大纲、设定、小故事、章节）
//! - Generation Context: 批次规划、章节标记、衔接锚点、上下文构建
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TextGenerator, Repositories, SessionManager, ProgressSink, Exporter, Runner）
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Memory: 生成会话内存实现
//! - Worker: 批次编排器与流式生成客户端
//! - Persistence: SQLite 存储
//! - Adapters: OpenAI 兼容聊天客户端、模拟生成器、纯文本导出
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
