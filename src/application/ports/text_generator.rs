//! Text Generator Port - 文本生成后端抽象
//!
//! 生成后端视为不透明能力：给定带角色的消息列表，返回文本，或以增量文本流返回。
//! 具体实现在 infrastructure/adapters/llm

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 生成错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// 是否为传输层错误（后端不可达、超时、服务端异常）
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GenerationError::Network(_) | GenerationError::Timeout(_) | GenerationError::Service { .. }
        )
    }
}

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// 对话消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// 增量文本流，流结束即生成完成
pub type TextDeltaStream = BoxStream<'static, Result<String, GenerationError>>;

/// Text Generator Port
#[async_trait]
pub trait TextGeneratorPort: Send + Sync {
    /// 非流式调用，返回完整文本
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, GenerationError>;

    /// 流式调用
    ///
    /// 丢弃返回的流即关闭底层连接
    async fn chat_stream(&self, messages: Vec<ChatMessage>)
        -> Result<TextDeltaStream, GenerationError>;

    /// 检查后端是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
