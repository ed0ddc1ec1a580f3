//! Fake Chat Client - 用于测试与离线运行的文本生成客户端
//!
//! 不实际调用模型服务。默认根据提示词中的"本次输出章节"行生成带标记的章节文本，
//! 或根据"本次生成小故事数量"行生成小故事细纲，
//! 也可以预先排队固定回复、失败或挂起，用于驱动各种生成场景

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use regex::Regex;
use std::collections::VecDeque;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::application::ports::{
    ChatMessage, ChatRole, GenerationError, TextDeltaStream, TextGeneratorPort,
};

/// 预设回复
#[derive(Debug, Clone)]
pub enum FakeReply {
    /// 按提示词中要求的章节自动生成
    Auto,
    /// 固定文本
    Text(String),
    /// 请求直接失败
    Fail(GenerationError),
    /// 输出 after_chars 个字符后以错误中断
    FailMidStream { after_chars: usize, error: GenerationError },
    /// 输出 partial 后不再有任何数据
    Hang { partial: String },
}

/// Fake Chat Client 配置
#[derive(Debug, Clone)]
pub struct FakeChatClientConfig {
    /// 每个增量的字符数
    pub chunk_chars: usize,
    /// 增量之间的延迟（毫秒）
    pub delay_ms: u64,
    /// 自动模式下每章正文字符数
    pub body_chars: usize,
}

impl Default for FakeChatClientConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 64,
            delay_ms: 0,
            body_chars: 300,
        }
    }
}

/// Fake Chat Client
pub struct FakeChatClient {
    config: FakeChatClientConfig,
    replies: Mutex<VecDeque<FakeReply>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

fn requested_chapters_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"第(\d+)章").expect("valid regex"))
}

/// 从最后一条用户消息的"本次输出章节："行中解析章节号
fn requested_chapters(messages: &[ChatMessage]) -> Vec<u32> {
    let Some(prompt) = messages.iter().rev().find(|m| m.role == ChatRole::User) else {
        return Vec::new();
    };
    prompt
        .content
        .lines()
        .find_map(|line| line.trim().strip_prefix("本次输出章节："))
        .map(|line| {
            requested_chapters_regex()
                .captures_iter(line)
                .filter_map(|c| c[1].parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// 从最后一条用户消息的"本次生成小故事数量："行中解析数量
fn requested_units(messages: &[ChatMessage]) -> Option<u32> {
    let prompt = messages.iter().rev().find(|m| m.role == ChatRole::User)?;
    prompt
        .content
        .lines()
        .find_map(|line| line.trim().strip_prefix("本次生成小故事数量："))
        .and_then(|count| count.trim().parse().ok())
}

fn split_chunks(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

impl FakeChatClient {
    pub fn new(config: FakeChatClientConfig) -> Self {
        tracing::info!(
            chunk_chars = config.chunk_chars,
            delay_ms = config.delay_ms,
            "FakeChatClient initialized"
        );
        Self {
            config,
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeChatClientConfig::default())
    }

    /// 排队一条回复；队列为空时使用 Auto
    pub async fn push_reply(&self, reply: FakeReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// 已收到的所有请求
    pub async fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().await.clone()
    }

    /// 自动模式的章节文本
    pub fn auto_text(&self, chapters: &[u32]) -> String {
        chapters
            .iter()
            .map(|n| {
                let body: String = format!("第{}章的正文内容。", n)
                    .chars()
                    .cycle()
                    .take(self.config.body_chars)
                    .collect();
                format!("第{}章 [自动章节{}]\n{}\n", n, n, body)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 自动模式的小故事细纲文本
    pub fn auto_breakdown(&self, count: u32) -> String {
        (1..=count)
            .map(|n| format!("【小故事{}】自动小故事{}\n第{}个小故事的情节细纲。", n, n, n))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn auto_reply(&self, messages: &[ChatMessage]) -> String {
        match requested_units(messages) {
            Some(count) => self.auto_breakdown(count),
            None => self.auto_text(&requested_chapters(messages)),
        }
    }

    async fn next_reply(&self, messages: &[ChatMessage]) -> FakeReply {
        self.calls.lock().await.push(messages.to_vec());
        self.replies.lock().await.pop_front().unwrap_or(FakeReply::Auto)
    }

    fn delta_stream(&self, text: &str) -> stream::BoxStream<'static, Result<String, GenerationError>> {
        let delay = Duration::from_millis(self.config.delay_ms);
        stream::iter(split_chunks(text, self.config.chunk_chars))
            .then(move |chunk| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            })
            .boxed()
    }
}

#[async_trait]
impl TextGeneratorPort for FakeChatClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, GenerationError> {
        match self.next_reply(&messages).await {
            FakeReply::Auto => Ok(self.auto_reply(&messages)),
            FakeReply::Text(text) => Ok(text),
            FakeReply::Fail(error) | FakeReply::FailMidStream { error, .. } => Err(error),
            FakeReply::Hang { .. } => {
                std::future::pending::<()>().await;
                Err(GenerationError::Cancelled)
            }
        }
    }

    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<TextDeltaStream, GenerationError> {
        let reply = self.next_reply(&messages).await;
        tracing::debug!(messages = messages.len(), "FakeChatClient: streaming reply");

        match reply {
            FakeReply::Auto => {
                let text = self.auto_text(&requested_chapters(&messages));
                Ok(self.delta_stream(&text))
            }
            FakeReply::Text(text) => Ok(self.delta_stream(&text)),
            FakeReply::Fail(error) => Err(error),
            FakeReply::FailMidStream { after_chars, error } => {
                let text = self.auto_text(&requested_chapters(&messages));
                let partial: String = text.chars().take(after_chars).collect();
                Ok(self
                    .delta_stream(&partial)
                    .chain(stream::once(async move { Err(error) }))
                    .boxed())
            }
            FakeReply::Hang { partial } => Ok(self
                .delta_stream(&partial)
                .chain(stream::pending())
                .boxed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(chapters: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("你是小说作者"),
            ChatMessage::user(format!("写作要求……\n本次输出章节：{}\n格式……", chapters)),
        ]
    }

    #[test]
    fn test_requested_chapters() {
        assert_eq!(requested_chapters(&prompt("第5章、第6章")), vec![5, 6]);
        assert!(requested_chapters(&[ChatMessage::user("无章节")]).is_empty());
    }

    #[tokio::test]
    async fn test_auto_stream_contains_markers() {
        let client = FakeChatClient::new(FakeChatClientConfig {
            chunk_chars: 7,
            ..Default::default()
        });
        let stream = client.chat_stream(prompt("第3章、第4章")).await.unwrap();
        let parts: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
        assert!(parts.len() > 1);
        let text = parts.concat();
        assert!(text.starts_with("第3章 [自动章节3]"));
        assert!(text.contains("第4章 [自动章节4]"));
        assert_eq!(client.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_auto_breakdown_follows_requested_count() {
        let client = FakeChatClient::with_defaults();
        let messages = vec![ChatMessage::user("中故事内容……\n本次生成小故事数量：3\n格式……")];
        let text = client.chat(messages).await.unwrap();
        assert_eq!(text.matches("【小故事").count(), 3);
        assert!(text.contains("【小故事3】自动小故事3"));
    }

    #[tokio::test]
    async fn test_queued_replies_in_order() {
        let client = FakeChatClient::with_defaults();
        client.push_reply(FakeReply::Text("固定".to_string())).await;
        client
            .push_reply(FakeReply::Fail(GenerationError::Timeout("slow".into())))
            .await;

        assert_eq!(client.chat(prompt("第1章")).await.unwrap(), "固定");
        let err = client.chat_stream(prompt("第1章")).await.err().unwrap();
        assert!(err.is_transport());
        // 队列耗尽后回到自动模式
        assert!(client.chat(prompt("第1章")).await.unwrap().contains("[自动章节1]"));
    }

    #[tokio::test]
    async fn test_fail_mid_stream() {
        let client = FakeChatClient::with_defaults();
        client
            .push_reply(FakeReply::FailMidStream {
                after_chars: 10,
                error: GenerationError::Network("reset".into()),
            })
            .await;
        let items: Vec<_> = client.chat_stream(prompt("第1章")).await.unwrap().collect().await;
        let (last, head) = items.split_last().unwrap();
        assert_eq!(
            head.iter().map(|r| r.as_ref().unwrap().chars().count()).sum::<usize>(),
            10
        );
        assert!(matches!(last, Err(GenerationError::Network(_))));
    }
}
