//! 衔接锚点
//!
//! 从刚完成的章节末尾截取一段结尾文本和最后一句，
//! 注入下一次生成调用，迫使其直接续写而不是复述或跳跃。

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::text_utils::{char_len, strip_leading_title_line, tail};

/// 最后一句的最大长度
const LAST_SENTENCE_MAX_CHARS: usize = 120;

/// 锚点长度窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorBounds {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for AnchorBounds {
    fn default() -> Self {
        Self {
            min_chars: 400,
            max_chars: 900,
        }
    }
}

/// 衔接锚点
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContinuityAnchor {
    /// 结尾段落
    pub ending: String,
    /// 最后一句
    pub last_sentence: String,
}

impl ContinuityAnchor {
    pub fn is_empty(&self) -> bool {
        self.ending.is_empty()
    }

    /// 生成提示词片段
    pub fn prompt_fragment(&self) -> String {
        let mut out = String::from("【上一章结尾（必须无缝衔接）】\n");
        out.push_str(&self.ending);
        if !self.last_sentence.is_empty() {
            out.push_str("\n\n【上一章最后一句】\n");
            out.push_str(&self.last_sentence);
            out.push_str(
                "\n\n要求：下一章必须紧接这句话继续写，不得复述、总结或改写上文，也不得跳过时间。",
            );
        }
        out
    }
}

fn paragraph_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n+").expect("valid regex"))
}

/// 提取结尾段落
///
/// 取最后一到两段；过长时保留尾部 `max_chars`，
/// 过短时改用正文末尾 `max_chars` 个字符（若更长）。
pub fn extract_ending(body: &str, bounds: AnchorBounds) -> String {
    let body = strip_leading_title_line(body).trim();
    if body.is_empty() {
        return String::new();
    }

    let paragraphs: Vec<&str> = paragraph_break_re()
        .split(body)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let skip = paragraphs.len().saturating_sub(2);
    let mut ending = paragraphs[skip..].join("\n\n");

    if char_len(&ending) > bounds.max_chars {
        ending = tail(&ending, bounds.max_chars).trim_start().to_string();
    }
    if char_len(&ending) < bounds.min_chars {
        let raw_tail = tail(body, bounds.max_chars).trim_start();
        if char_len(raw_tail) > char_len(&ending) {
            ending = raw_tail.to_string();
        }
    }
    ending
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '…' | '!' | '?' | '.')
}

fn is_closing(c: char) -> bool {
    matches!(c, '”' | '’' | '"' | '\'' | '」' | '』' | '）' | ')')
}

/// 提取最后一句
///
/// 句末标点之后若还有未完成的句子，取这段未完成的文字；
/// 否则取最后一个完整句子；都找不到时退回末尾字符。
pub fn extract_last_sentence(body: &str) -> String {
    let body = strip_leading_title_line(body).trim();
    if body.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = body.chars().collect();

    // 去掉结尾的闭合引号后定位句末
    let mut end = chars.len();
    while end > 0 && is_closing(chars[end - 1]) {
        end -= 1;
    }

    let sentence: String = if end > 0 && is_sentence_end(chars[end - 1]) {
        let mut stop = end;
        while stop > 0 && is_sentence_end(chars[stop - 1]) {
            stop -= 1;
        }
        let start = chars[..stop]
            .iter()
            .rposition(|c| is_sentence_end(*c) || *c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        chars[start..].iter().collect()
    } else {
        match chars.iter().rposition(|c| is_sentence_end(*c)) {
            Some(i) => chars[i + 1..].iter().collect(),
            None => String::new(),
        }
    };

    let sentence = sentence.trim();
    if sentence.is_empty() {
        return tail(body, LAST_SENTENCE_MAX_CHARS).trim().to_string();
    }
    tail(sentence, LAST_SENTENCE_MAX_CHARS).trim().to_string()
}

/// 提取完整锚点
pub fn extract_anchor(body: &str, bounds: AnchorBounds) -> ContinuityAnchor {
    ContinuityAnchor {
        ending: extract_ending(body, bounds),
        last_sentence: extract_last_sentence(body),
    }
}
