//! Project Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::text_utils::word_count;

/// 小故事（叙事单元），每个单元固定对应两章
///
/// 不变量:
/// - 创建后不可修改
/// - 全局顺序由 (group_index, order_in_group, created_at) 决定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeUnit {
    id: String,
    title: String,
    body: String,
    /// 所属中故事 ID
    parent_group_id: String,
    /// 所属中故事序号
    group_index: u32,
    /// 所属中故事标题
    group_title: String,
    /// 中故事内顺序
    order_in_group: u32,
    created_at: DateTime<Utc>,
}

impl NarrativeUnit {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        parent_group_id: impl Into<String>,
        group_index: u32,
        group_title: impl Into<String>,
        order_in_group: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, &'static str> {
        let id = id.into();
        let title = title.into().trim().to_string();
        if id.trim().is_empty() {
            return Err("小故事 ID 不能为空");
        }
        if title.is_empty() {
            return Err("小故事标题不能为空");
        }
        Ok(Self {
            id,
            title,
            body: body.into().trim().to_string(),
            parent_group_id: parent_group_id.into(),
            group_index,
            group_title: group_title.into(),
            order_in_group,
            created_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn parent_group_id(&self) -> &str {
        &self.parent_group_id
    }

    pub fn group_index(&self) -> u32 {
        self.group_index
    }

    pub fn group_title(&self) -> &str {
        &self.group_title
    }

    pub fn order_in_group(&self) -> u32 {
        self.order_in_group
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 全局排序键
    pub fn sort_key(&self) -> (u32, u32, DateTime<Utc>) {
        (self.group_index, self.order_in_group, self.created_at)
    }
}

/// 已完成章节
///
/// 章节只在完整解析出来后才会创建，不存在“半章”。
/// `placeholder` 标记格式降级时补出的空章节。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    number: u32,
    title: String,
    body: String,
    word_count: usize,
    placeholder: bool,
}

impl ChapterRecord {
    pub fn new(number: u32, title: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into().trim().to_string();
        Self {
            number,
            title: title.into().trim().to_string(),
            word_count: word_count(&body),
            body,
            placeholder: false,
        }
    }

    /// 格式降级时的占位章节
    pub fn placeholder(number: u32) -> Self {
        Self {
            number,
            title: "待重新生成".to_string(),
            body: String::new(),
            word_count: 0,
            placeholder: true,
        }
    }

    /// 从存储恢复
    pub fn restore(number: u32, title: String, body: String, placeholder: bool) -> Self {
        Self {
            number,
            title,
            word_count: word_count(&body),
            body,
            placeholder,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// 标题行，如 `第3章 [夜雨]`
    pub fn heading(&self) -> String {
        format!("第{}章 [{}]", self.number, self.title)
    }

    /// 标题行 + 正文
    pub fn full_text(&self) -> String {
        if self.body.is_empty() {
            self.heading()
        } else {
            format!("{}\n\n{}", self.heading(), self.body)
        }
    }
}
