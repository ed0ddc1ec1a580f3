//! Memory Layer - In-Memory State Management
//!
//! 生成会话的内存状态与取消令牌

mod session_manager;

pub use session_manager::InMemorySessionManager;
