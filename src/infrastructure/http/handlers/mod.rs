//! HTTP Handlers

mod generation;
mod ping;
mod project;
mod websocket;

pub use generation::*;
pub use ping::*;
pub use project::*;
pub use websocket::*;
