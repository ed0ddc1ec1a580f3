//! 文本工具
//!
//! 章节正文的字符级截取、清洗与字数统计。所有长度均按 char 计算，避免切断多字节字符。

use std::sync::OnceLock;

use regex::Regex;

/// 截取前 `max_chars` 个字符
pub fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// 截取后 `max_chars` 个字符
pub fn tail(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    match text.char_indices().nth(total - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// 字符数
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn title_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[ \t]*(?:第[ \t]*\d+[ \t]*章|[Cc]hapter[ \t]+\d+)").expect("valid regex")
    })
}

/// 去掉开头的章节标题行（如 `第3章 [夜雨]`）
pub fn strip_leading_title_line(text: &str) -> &str {
    let trimmed = text.trim_start();
    let first_line_end = trimmed.find('\n').unwrap_or(trimmed.len());
    if title_line_re().is_match(&trimmed[..first_line_end]) {
        trimmed[first_line_end..].trim_start()
    } else {
        trimmed
    }
}

/// 字数统计：汉字按字计，其余按连续字母数字串计为一个词，标题行不计
pub fn word_count(text: &str) -> usize {
    let body = strip_leading_title_line(text);
    let mut count = 0;
    let mut in_word = false;
    for c in body.chars() {
        if ('\u{4e00}'..='\u{9fa5}').contains(&c) {
            count += 1;
            in_word = false;
        } else if c.is_alphanumeric() {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    count
}

struct CleanRules {
    fence: Regex,
    rule: Regex,
    heading: Regex,
    quote: Regex,
    list: Regex,
    bold: Regex,
    bold_underscore: Regex,
    italic: Regex,
    emoji: Regex,
    blank_lines: Regex,
}

fn clean_rules() -> &'static CleanRules {
    static RULES: OnceLock<CleanRules> = OnceLock::new();
    RULES.get_or_init(|| CleanRules {
        fence: Regex::new(r"(?m)^[ \t]*```[^\n]*\n?").expect("valid regex"),
        rule: Regex::new(r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,})[ \t]*$").expect("valid regex"),
        heading: Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("valid regex"),
        quote: Regex::new(r"(?m)^[ \t]*>[ \t]?").expect("valid regex"),
        list: Regex::new(r"(?m)^[ \t]*(?:[-*+]|\d+\.)[ \t]+").expect("valid regex"),
        bold: Regex::new(r"\*\*([^*\n]+)\*\*").expect("valid regex"),
        bold_underscore: Regex::new(r"__([^_\n]+)__").expect("valid regex"),
        italic: Regex::new(r"\*([^*\n]+)\*").expect("valid regex"),
        emoji: Regex::new(r"[\x{1F300}-\x{1FAFF}\x{2600}-\x{27BF}\x{FE0F}]").expect("valid regex"),
        blank_lines: Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"),
    })
}

/// 清洗模型输出：去除 Markdown 标记与表情，压缩多余空行
pub fn clean_generated_text(text: &str) -> String {
    let rules = clean_rules();
    let text = text.replace("\r\n", "\n");
    let text = rules.fence.replace_all(&text, "");
    let text = rules.rule.replace_all(&text, "");
    let text = rules.heading.replace_all(&text, "");
    let text = rules.quote.replace_all(&text, "");
    let text = rules.list.replace_all(&text, "");
    let text = rules.bold.replace_all(&text, "$1");
    let text = rules.bold_underscore.replace_all(&text, "$1");
    let text = rules.italic.replace_all(&text, "$1");
    let text = rules.emoji.replace_all(&text, "");
    let text = rules.blank_lines.replace_all(&text, "\n\n");
    text.trim().to_string()
}
