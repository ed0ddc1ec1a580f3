//! SQLite Persistence - SQLite 数据库持久化实现

mod chapter_store;
mod database;
mod project_repo;

pub use chapter_store::*;
pub use database::*;
pub use project_repo::*;
