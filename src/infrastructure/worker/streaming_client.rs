//! Streaming Generation Client
//!
//! 包装文本生成后端：每个子单元一次调用，增量文本带上子单元的章节号转发给进度通道，
//! 同时在本地累积完整文本。取消令牌在等待后端的每个挂起点都会被检查，
//! 触发时丢弃流（即关闭底层连接）并返回 `GenerationError::Cancelled`。

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    ChatMessage, GenerationError, LifecycleEvent, ProgressSinkPort, TextGeneratorPort,
};

#[derive(Debug, Clone)]
pub struct StreamingClientConfig {
    /// false 时使用非流式调用，整段文本作为一个增量发出
    pub streaming: bool,
    /// 两个增量之间允许的最长静默时间
    pub idle_timeout: Duration,
}

impl Default for StreamingClientConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            idle_timeout: Duration::from_secs(120),
        }
    }
}

pub struct StreamingGenerationClient {
    generator: Arc<dyn TextGeneratorPort>,
    sink: Arc<dyn ProgressSinkPort>,
    config: StreamingClientConfig,
}

impl StreamingGenerationClient {
    pub fn new(
        generator: Arc<dyn TextGeneratorPort>,
        sink: Arc<dyn ProgressSinkPort>,
        config: StreamingClientConfig,
    ) -> Self {
        Self {
            generator,
            sink,
            config,
        }
    }

    /// 生成一个子单元的文本
    pub async fn generate(
        &self,
        session_id: &str,
        chapters: &[u32],
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let text = if self.config.streaming {
            self.generate_streaming(session_id, chapters, messages, cancel)
                .await?
        } else {
            self.generate_whole(session_id, chapters, messages, cancel)
                .await?
        };

        if text.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "backend returned empty text".to_string(),
            ));
        }
        Ok(text)
    }

    fn forward(&self, session_id: &str, chapters: &[u32], delta: String) {
        self.sink.publish(
            session_id,
            LifecycleEvent::TextDelta {
                chapters: chapters.to_vec(),
                partial_text: delta,
            },
        );
    }

    async fn generate_streaming(
        &self,
        session_id: &str,
        chapters: &[u32],
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = self.generator.chat_stream(messages) => result?,
        };

        let mut text = String::new();
        let mut deltas = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(
                        session_id = %session_id,
                        chapters = ?chapters,
                        received_chars = text.chars().count(),
                        "Stream aborted by cancellation, discarding partial output"
                    );
                    return Err(GenerationError::Cancelled);
                }
                next = tokio::time::timeout(self.config.idle_timeout, stream.next()) => next,
            };

            match next {
                Err(_) => {
                    return Err(GenerationError::Timeout(format!(
                        "no data for {}s",
                        self.config.idle_timeout.as_secs()
                    )))
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => return Err(e),
                Ok(Some(Ok(delta))) => {
                    if delta.is_empty() {
                        continue;
                    }
                    deltas += 1;
                    text.push_str(&delta);
                    self.forward(session_id, chapters, delta);
                }
            }
        }

        tracing::debug!(
            session_id = %session_id,
            chapters = ?chapters,
            deltas = deltas,
            chars = text.chars().count(),
            "Stream finished"
        );
        Ok(text)
    }

    async fn generate_whole(
        &self,
        session_id: &str,
        chapters: &[u32],
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = self.generator.chat(messages) => result?,
        };
        self.forward(session_id, chapters, text.clone());
        Ok(text)
    }
}
