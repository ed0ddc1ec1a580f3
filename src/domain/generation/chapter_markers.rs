//! 章节标记语法与分章
//!
//! 标记语法 v1：独占一行的 `第<n>章 [<标题>]` 或 `Chapter <n> [<标题>]`，
//! 标题括号可为 `[]` 或 `【】`，标题不能为空。
//! 违反语法的输出按 [`FormatIssue`] 上报，不做猜测式切分。

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::project::ChapterRecord;

/// 当前标记语法版本
pub const MARKER_GRAMMAR_VERSION: u32 = 1;

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:第[ \t]*(\d+)[ \t]*章|[Cc]hapter[ \t]+(\d+))[ \t]*(?:\[([^\]\n]+)\]|【([^】\n]+)】)[ \t]*\r?$",
        )
        .expect("valid regex")
    })
}

/// 标记出现位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMarker {
    pub number: u32,
    pub title: String,
    /// 标记行起始字节偏移
    pub line_start: usize,
    /// 标记行结束字节偏移（正文从此开始）
    pub line_end: usize,
}

/// 扫描全部标记
pub fn find_markers(text: &str) -> Vec<ChapterMarker> {
    marker_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps
                .get(1)
                .or_else(|| caps.get(2))
                .and_then(|m| m.as_str().parse::<u32>().ok())?;
            let title = caps.get(3).or_else(|| caps.get(4))?.as_str().trim().to_string();
            Some(ChapterMarker {
                number,
                title,
                line_start: whole.start(),
                line_end: whole.end(),
            })
        })
        .collect()
}

/// 格式问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatIssue {
    /// 标记数少于预期，触发整段降级
    MissingMarkers { expected: u32, found: u32 },
    /// 标记数多于预期，多余部分被丢弃
    ExtraMarkers { expected: u32, found: u32 },
    /// 标记章节号与预期不符，已按预期重新编号
    NumberMismatch { expected: Vec<u32>, found: Vec<u32> },
    /// 标记存在但正文为空
    EmptyBody { chapter: u32 },
}

impl FormatIssue {
    /// 是否触发了降级（整段归入首章、其余补占位）
    pub fn is_fallback(&self) -> bool {
        matches!(self, FormatIssue::MissingMarkers { .. })
    }
}

impl fmt::Display for FormatIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatIssue::MissingMarkers { expected, found } => {
                write!(f, "expected {} chapter markers, found {}", expected, found)
            }
            FormatIssue::ExtraMarkers { expected, found } => {
                write!(f, "expected {} chapter markers, found {} (extra dropped)", expected, found)
            }
            FormatIssue::NumberMismatch { expected, found } => {
                write!(f, "chapter numbers {:?} renumbered to {:?}", found, expected)
            }
            FormatIssue::EmptyBody { chapter } => write!(f, "chapter {} has an empty body", chapter),
        }
    }
}

/// 分章结果
#[derive(Debug, Clone)]
pub struct Partition {
    pub chapters: Vec<ChapterRecord>,
    pub issues: Vec<FormatIssue>,
}

impl Partition {
    pub fn used_fallback(&self) -> bool {
        self.issues.iter().any(FormatIssue::is_fallback)
    }
}

/// 去掉正文开头与标题重复的一行
fn strip_duplicate_title<'a>(body: &'a str, title: &str) -> &'a str {
    let body = body.trim_start();
    let first_end = body.find('\n').unwrap_or(body.len());
    if body[..first_end].trim() == title {
        body[first_end..].trim_start()
    } else {
        body
    }
}

/// 将一次生成输出切分为 `expected` 个章节，章节号从 `first_chapter` 开始
///
/// - 标记足够：按标记切分，第一个标记之前的前言丢弃
/// - 标记不足：整段作为首章，其余章节补占位，并报告 `MissingMarkers`；
///   仅当开头就是本章标记时沿用其标题
pub fn partition_chapters(text: &str, first_chapter: u32, expected: u32) -> Partition {
    let markers = find_markers(text);
    let mut issues = Vec::new();
    let found = markers.len() as u32;

    if found < expected {
        issues.push(FormatIssue::MissingMarkers { expected, found });
        // 只有位于开头且章节号相符的标记才提供标题，正文始终保留全部输出
        let leading = markers.first().filter(|m| {
            m.number == first_chapter && text[..m.line_start].trim().is_empty()
        });
        let (title, body) = match leading {
            Some(first) => (
                first.title.clone(),
                strip_duplicate_title(&text[first.line_end..], &first.title),
            ),
            None => (format!("第{}章", first_chapter), text),
        };
        let mut chapters = vec![ChapterRecord::new(first_chapter, title, body.trim())];
        chapters.extend((1..expected).map(|i| ChapterRecord::placeholder(first_chapter + i)));
        return Partition { chapters, issues };
    }

    if found > expected {
        issues.push(FormatIssue::ExtraMarkers { expected, found });
    }

    let used = &markers[..expected as usize];
    let expected_numbers: Vec<u32> = (0..expected).map(|i| first_chapter + i).collect();
    let found_numbers: Vec<u32> = used.iter().map(|m| m.number).collect();
    if found_numbers != expected_numbers {
        issues.push(FormatIssue::NumberMismatch {
            expected: expected_numbers.clone(),
            found: found_numbers,
        });
    }

    let mut chapters = Vec::with_capacity(expected as usize);
    for (i, marker) in used.iter().enumerate() {
        let end = markers
            .get(i + 1)
            .map(|next| next.line_start)
            .unwrap_or(text.len());
        let body = strip_duplicate_title(&text[marker.line_end..end], &marker.title).trim();
        let number = expected_numbers[i];
        if body.is_empty() {
            issues.push(FormatIssue::EmptyBody { chapter: number });
        }
        chapters.push(ChapterRecord::new(number, marker.title.clone(), body));
    }

    Partition { chapters, issues }
}
