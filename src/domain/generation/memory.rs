//! 滚动记忆
//!
//! 本次运行中已完成子单元的紧凑摘要，总长度有上限，超出时丢弃最旧的摘要。

use std::collections::VecDeque;

use crate::domain::project::ChapterRecord;
use crate::domain::text_utils::{char_len, head, tail};

/// 章节摘要的首尾片段长度
pub const DIGEST_SNIPPET_CHARS: usize = 260;

/// 章节紧凑摘要：标题行 + 正文首尾片段
pub fn chapter_digest(chapter: &ChapterRecord, snippet_chars: usize) -> String {
    let body = chapter.body();
    if char_len(body) <= snippet_chars * 2 {
        return format!("{}\n{}", chapter.heading(), body);
    }
    format!(
        "{}\n{}……{}",
        chapter.heading(),
        head(body, snippet_chars),
        tail(body, snippet_chars)
    )
}

#[derive(Debug, Clone)]
pub struct StoryMemory {
    cap_chars: usize,
    digests: VecDeque<String>,
}

impl StoryMemory {
    pub fn new(cap_chars: usize) -> Self {
        Self {
            cap_chars,
            digests: VecDeque::new(),
        }
    }

    fn total_chars(&self) -> usize {
        self.digests.iter().map(|d| char_len(d)).sum()
    }

    /// 追加一条摘要，超出上限时从最旧的开始丢弃
    pub fn push(&mut self, digest: String) {
        let digest = if char_len(&digest) > self.cap_chars {
            tail(&digest, self.cap_chars).to_string()
        } else {
            digest
        };
        self.digests.push_back(digest);
        while self.total_chars() > self.cap_chars && self.digests.len() > 1 {
            self.digests.pop_front();
        }
    }

    /// 记录已完成章节
    pub fn remember(&mut self, chapters: &[ChapterRecord]) {
        for chapter in chapters.iter().filter(|c| !c.is_placeholder()) {
            self.push(chapter_digest(chapter, DIGEST_SNIPPET_CHARS));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn render(&self) -> Option<String> {
        if self.digests.is_empty() {
            return None;
        }
        let joined: Vec<&str> = self.digests.iter().map(String::as_str).collect();
        Some(format!("【前情提要】\n{}", joined.join("\n\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_keeps_head_and_tail() {
        let body = format!("{}{}{}", "首".repeat(300), "中".repeat(300), "尾".repeat(300));
        let chapter = ChapterRecord::new(1, "开端", body);
        let digest = chapter_digest(&chapter, DIGEST_SNIPPET_CHARS);
        assert!(digest.starts_with("第1章 [开端]\n"));
        assert!(!digest.contains('中'));
        assert!(digest.ends_with(&"尾".repeat(260)));
    }

    #[test]
    fn test_memory_drops_oldest_when_over_cap() {
        let mut memory = StoryMemory::new(10);
        memory.push("一二三四五".to_string());
        memory.push("六七八九十".to_string());
        assert_eq!(memory.len(), 2);
        memory.push("甲乙".to_string());
        assert_eq!(memory.len(), 2);
        let rendered = memory.render().unwrap();
        assert!(!rendered.contains("一二三"));
        assert!(rendered.contains("甲乙"));
    }

    #[test]
    fn test_placeholders_not_remembered() {
        let mut memory = StoryMemory::new(3000);
        memory.remember(&[ChapterRecord::placeholder(2)]);
        assert!(memory.is_empty());
        assert!(memory.render().is_none());
    }
}
