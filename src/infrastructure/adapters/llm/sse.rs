//! SSE 解码
//!
//! 按字节缓冲，遇到空行才切出完整事件。多字节字符可能跨越两个网络分包。

use serde::Deserialize;

use crate::application::ports::GenerationError;

/// 解码出的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

fn find_event_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_event(block: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(block);
    let data: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if data.is_empty() {
        return None;
    }
    let payload = data.join("\n");
    if payload.trim() == "[DONE]" {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(payload))
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 追加字节，返回其中已完整的事件
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some((pos, sep)) = find_event_end(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..pos + sep).take(pos).collect();
            if let Some(event) = parse_event(&block) {
                let done = event == SseEvent::Done;
                events.push(event);
                if done {
                    self.done = true;
                    self.buffer.clear();
                    break;
                }
            }
        }
        events
    }

    /// 连接关闭时处理缓冲区中残留的最后一个事件
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.done || self.buffer.is_empty() {
            return None;
        }
        let block = std::mem::take(&mut self.buffer);
        parse_event(&block)
    }
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

/// 从一个 OpenAI 兼容的流式 chunk 中取出文本增量
pub fn delta_text(payload: &str) -> Result<Option<String>, GenerationError> {
    let chunk: CompletionChunk = serde_json::from_str(payload)
        .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse chunk: {}", e)))?;
    if let Some(error) = chunk.error {
        return Err(GenerationError::Service {
            status: 200,
            message: error.message,
        });
    }
    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .collect();
    Ok(if text.is_empty() { None } else { Some(text) })
}
