//! HTTP Chat Client - 调用 OpenAI 兼容的 chat/completions 接口
//!
//! 实现 TextGeneratorPort trait
//!
//! POST {base_url}/chat/completions
//! Request: {"model": "...", "messages": [...], "temperature": 1.2, "max_tokens": 8192, "stream": bool}
//! 流式响应为 SSE，每个事件携带 choices[].delta.content，以 `data: [DONE]` 结束

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::sse::{delta_text, SseDecoder, SseEvent};
use crate::application::ports::{ChatMessage, GenerationError, TextDeltaStream, TextGeneratorPort};

/// 请求体
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

/// HTTP Chat 客户端配置
#[derive(Debug, Clone)]
pub struct HttpChatClientConfig {
    /// 接口基础 URL（如 https://api.openai.com/v1）
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// 非流式请求超时时间（秒）
    pub timeout_secs: u64,
    /// 非流式请求的重试次数；流式请求从不重试
    pub max_retries: u32,
}

impl Default for HttpChatClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: None,
            model: "deepseek-chat".to_string(),
            temperature: 1.2,
            max_tokens: 8192,
            timeout_secs: 300,
            max_retries: 1,
        }
    }
}

impl HttpChatClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// HTTP Chat 客户端
pub struct HttpChatClient {
    client: Client,
    config: HttpChatClientConfig,
}

fn map_send_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(e.to_string())
    } else if e.is_connect() {
        GenerationError::Network(format!("Cannot connect to generation backend: {}", e))
    } else {
        GenerationError::Network(e.to_string())
    }
}

impl HttpChatClient {
    pub fn new(config: HttpChatClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url.trim_end_matches('/'))
    }

    fn request(&self, messages: &[ChatMessage], stream: bool) -> reqwest::RequestBuilder {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
        };
        let mut req = self.client.post(self.completions_url()).json(&body);
        if let Some(api_key) = &self.config.api_key {
            req = req.bearer_auth(api_key);
        }
        req
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(GenerationError::Service {
            status: status.as_u16(),
            message,
        })
    }

    async fn chat_once(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let response = self
            .request(messages, false)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(map_send_error)?;
        let response = Self::check_status(response).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("empty choices".to_string()))
    }
}

#[async_trait]
impl TextGeneratorPort for HttpChatClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.chat_once(&messages).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transport() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt = attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "Chat request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<TextDeltaStream, GenerationError> {
        tracing::debug!(
            url = %self.completions_url(),
            model = %self.config.model,
            messages = messages.len(),
            "Sending streaming chat request"
        );

        let response = self
            .request(&messages, true)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = Self::check_status(response).await?;

        // 每个网络分包可能包含 0..n 个完整事件，先展开再过滤出文本增量
        let bytes = response.bytes_stream().map(Some).chain(stream::once(async { None }));
        let deltas = bytes
            .scan(SseDecoder::new(), |decoder, item| {
                let events: Vec<Result<SseEvent, GenerationError>> = match item {
                    Some(Ok(chunk)) => decoder.push(&chunk).into_iter().map(Ok).collect(),
                    Some(Err(e)) => vec![Err(map_send_error(e))],
                    None => decoder.finish().into_iter().map(Ok).collect(),
                };
                futures_util::future::ready(Some(stream::iter(events)))
            })
            .flatten()
            .take_while(|event| futures_util::future::ready(!matches!(event, Ok(SseEvent::Done))))
            .filter_map(|event| async move {
                match event {
                    Ok(SseEvent::Data(payload)) => delta_text(&payload).transpose(),
                    Ok(SseEvent::Done) => None,
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(deltas.boxed())
    }

    async fn health_check(&self) -> bool {
        let mut req = self.client.get(self.models_url()).timeout(Duration::from_secs(5));
        if let Some(api_key) = &self.config.api_key {
            req = req.bearer_auth(api_key);
        }
        match req.send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpChatClientConfig::default();
        assert_eq!(config.max_tokens, 8192);
        assert_eq!(config.max_retries, 1);
        assert!((config.temperature - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpChatClientConfig::new("https://api.example.com/v1/")
            .with_model("gpt-4o")
            .with_api_key("sk-test");
        let client = HttpChatClient::new(config).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(client.config.model, "gpt-4o");
        assert_eq!(client.config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_request_body_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = ChatCompletionRequest {
            model: "m",
            messages: &messages,
            temperature: 1.0,
            max_tokens: 10,
            stream: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["stream"], true);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let config = HttpChatClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            max_retries: 0,
            ..Default::default()
        };
        let client = HttpChatClient::new(config).unwrap();
        let err = client
            .chat_stream(vec![ChatMessage::user("hi")])
            .await
            .err()
            .unwrap();
        assert!(err.is_transport());
        assert!(!client.health_check().await);
    }
}
