//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod generation_commands;
mod project_commands;

pub mod handlers;

pub use generation_commands::*;
pub use project_commands::*;
