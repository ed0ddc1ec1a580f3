//! LLM Adapter - 文本生成后端客户端实现

mod fake_chat_client;
mod http_chat_client;
mod sse;

pub use fake_chat_client::{FakeChatClient, FakeChatClientConfig, FakeReply};
pub use http_chat_client::{HttpChatClient, HttpChatClientConfig};
