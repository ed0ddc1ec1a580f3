//! 小故事细纲解析
//!
//! 将上游细化阶段输出的文本解析为小故事列表，支持两种标题写法：
//! `【小故事1】标题` 与 `小故事1：标题`，标题行之后到下一个标题之前为内容。

use std::sync::OnceLock;

use chrono::{Duration, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::domain::project::NarrativeUnit;

/// 所属中故事
#[derive(Debug, Clone)]
pub struct UnitGroup {
    pub id: String,
    pub index: u32,
    pub title: String,
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:【小故事[ \t]*([一二三四五六七八九十百零〇\d]+)】|小故事[ \t]*([一二三四五六七八九十百零〇\d]+)[ \t]*[:：])[ \t]*(.*)$",
        )
        .expect("valid regex")
    })
}

fn strip_label(line: &str) -> &str {
    let line = line.trim();
    for label in ["标题：", "标题:", "内容：", "内容:"] {
        if let Some(rest) = line.strip_prefix(label) {
            return rest.trim();
        }
    }
    line
}

/// 解析细纲文本，未识别到任何标题时返回空列表
///
/// 同一批解析出的小故事创建时间按出现顺序递增，保证排序稳定。
pub fn parse_micro_stories(text: &str, group: &UnitGroup) -> Vec<NarrativeUnit> {
    let headings: Vec<(usize, usize, String)> = heading_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let rest = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            Some((whole.start(), whole.end(), strip_label(rest).to_string()))
        })
        .collect();

    let base_time = Utc::now();
    let mut units = Vec::with_capacity(headings.len());
    for (i, (_, end, heading_title)) in headings.iter().enumerate() {
        let next = headings.get(i + 1).map(|h| h.0).unwrap_or(text.len());
        let mut lines = text[*end..next]
            .lines()
            .map(strip_label)
            .filter(|l| !l.is_empty());

        let title = if heading_title.is_empty() {
            match lines.next() {
                Some(line) => line.to_string(),
                None => continue,
            }
        } else {
            heading_title.clone()
        };
        let body = lines.collect::<Vec<_>>().join("\n");

        let order = units.len() as u32 + 1;
        let created_at = base_time + Duration::milliseconds(order as i64);
        if let Ok(unit) = NarrativeUnit::new(
            format!("micro_{}_{}", group.index, Uuid::new_v4().simple()),
            title,
            body,
            group.id.clone(),
            group.index,
            group.title.clone(),
            order,
            created_at,
        ) {
            units.push(unit);
        }
    }
    units
}

/// 一个中故事默认拆分出的小故事数
pub const DEFAULT_BREAKDOWN_UNITS: u32 = 10;

/// 生成小故事细纲的提示词，要求的标题写法与 [`parse_micro_stories`] 一致
///
/// `first_chapter` 为这批小故事对应的第一章，用于提示章节连续。
pub fn breakdown_prompt(
    macro_story: &str,
    group: &UnitGroup,
    unit_count: u32,
    first_chapter: u32,
) -> String {
    let last_chapter = first_chapter + unit_count * 2 - 1;
    let heading = if group.title.is_empty() {
        format!("中故事{}", group.index)
    } else {
        format!("中故事{}《{}》", group.index, group.title)
    };
    [
        format!(
            "基于以下中故事内容，拆分出{}个小故事的具体情节细纲，对应小说第{}-{}章。",
            unit_count, first_chapter, last_chapter
        ),
        String::new(),
        format!("{}内容：", heading),
        macro_story.trim().to_string(),
        String::new(),
        "【任务要求】".to_string(),
        format!("本次生成小故事数量：{}", unit_count),
        "1. 每个小故事包含完整的开端、发展、高潮与结局".to_string(),
        "2. 每个小故事写作两章，细纲要能支撑约4400字的正文".to_string(),
        "3. 与中故事主线紧密关联，包含具体的场景、冲突与转折".to_string(),
        "【输出格式】".to_string(),
        "每个小故事以单独一行的【小故事N】标题开头，下一行起为情节细纲。".to_string(),
        "直接输出细纲，不要添加任何额外说明。".to_string(),
    ]
    .join("\n")
}
