//! ContextBuilder - 批次上下文构建
//!
//! 纯函数：输入项目状态和批次起始章节号，输出长度受控的上下文文本。
//! 章节号总是显式传入，不读取任何“当前章节”之类的外部可变状态。
//!
//! 组装顺序:
//! 1. 项目大纲（完整）
//! 2. 世界观、人物设定节选（按预算截断）
//! 3. 情节架构节选（按预算截断）
//! 4. 仅本批次对应的小故事
//!
//! 当前章节的重点小故事由 [`ContextBuilder::focus_block`] 单独生成。

use std::ops::Range;

use super::batch::{BATCH_CHAPTER_CAP, UNITS_PER_BATCH};
use crate::domain::project::{Project, CHAPTERS_PER_UNIT};
use crate::domain::text_utils::{char_len, head};

/// 截断标记
pub const TRUNCATION_MARKER: &str = "……（已截断）";

/// 各段落的字符预算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub world_setting_chars: usize,
    pub character_sheet_chars: usize,
    pub plot_outline_chars: usize,
    /// 单个小故事内容上限
    pub unit_body_chars: usize,
    /// 开篇章节参考的正文上限
    pub opening_reference_chars: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            world_setting_chars: 1000,
            character_sheet_chars: 800,
            plot_outline_chars: 600,
            unit_body_chars: 500,
            opening_reference_chars: 500,
        }
    }
}

/// 超出预算时截断并追加标记
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if char_len(text) <= max_chars {
        return text.to_string();
    }
    format!("{}{}", head(text, max_chars), TRUNCATION_MARKER)
}

/// 批次起始章节对应的小故事下标窗口
///
/// `floor((c - 1) / 8) * 4 .. + 4`，并裁剪到实际小故事数量
pub fn unit_window(batch_start: u32, unit_count: usize) -> Range<usize> {
    let start = (batch_start.saturating_sub(1) / BATCH_CHAPTER_CAP * UNITS_PER_BATCH) as usize;
    let end = start + UNITS_PER_BATCH as usize;
    start.min(unit_count)..end.min(unit_count)
}

#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    budget: ContextBudget,
}

impl ContextBuilder {
    pub fn new(budget: ContextBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    /// 构建批次上下文
    pub fn build(&self, project: &Project, batch_start: u32) -> String {
        let mut sections = vec![format!("=== {} - 完整故事架构背景 ===", project.book_name())];

        sections.push(self.outline_section(project));

        let bible = project.bible();
        let excerpts = [
            ("世界观设定", &bible.world_setting, self.budget.world_setting_chars),
            ("人物设定", &bible.character_sheet, self.budget.character_sheet_chars),
            ("情节架构", &bible.plot_outline, self.budget.plot_outline_chars),
        ];
        for (label, text, budget) in excerpts {
            if !text.trim().is_empty() {
                sections.push(format!("【{}】\n{}", label, truncate_with_marker(text, budget)));
            }
        }

        if let Some(opening) = self.opening_reference(project, batch_start) {
            sections.push(opening);
        }

        let window = unit_window(batch_start, project.units().len());
        if !window.is_empty() {
            let mut block = String::from("【本批次小故事细纲】");
            for index in window {
                let unit = &project.units()[index];
                let first = index as u32 * CHAPTERS_PER_UNIT + 1;
                block.push_str(&format!(
                    "\n小故事{}（第{}-{}章）：{}\n{}",
                    index + 1,
                    first,
                    first + CHAPTERS_PER_UNIT - 1,
                    unit.title(),
                    truncate_with_marker(unit.body(), self.budget.unit_body_chars)
                ));
            }
            sections.push(block);
        }

        sections.join("\n\n")
    }

    fn outline_section(&self, project: &Project) -> String {
        let outline = project.outline();
        let mut lines = vec![
            "【项目大纲】".to_string(),
            format!("书名：{}", project.book_name()),
        ];
        let fields = [
            ("核心概念", &outline.logline),
            ("人物关系", &outline.characters),
            ("世界观设定", &outline.world),
            ("主要冲突", &outline.conflict),
            ("金手指设定", &outline.gimmick),
        ];
        for (label, value) in fields {
            if !value.trim().is_empty() {
                lines.push(format!("{}：{}", label, value.trim()));
            }
        }
        lines.join("\n")
    }

    /// 第一批之后附带第 1、2 章的开篇参考，保持人物与文风一致
    fn opening_reference(&self, project: &Project, batch_start: u32) -> Option<String> {
        if batch_start <= BATCH_CHAPTER_CAP {
            return None;
        }
        let refs: Vec<String> = (1..=CHAPTERS_PER_UNIT)
            .filter_map(|n| project.chapter(n))
            .filter(|c| !c.is_placeholder())
            .map(|c| {
                format!(
                    "{}\n{}",
                    c.heading(),
                    truncate_with_marker(c.body(), self.budget.opening_reference_chars)
                )
            })
            .collect();
        if refs.is_empty() {
            return None;
        }
        Some(format!("【开篇章节参考】\n{}", refs.join("\n\n")))
    }

    /// 当前章节对应的重点小故事
    pub fn focus_block(&self, project: &Project, chapter: u32) -> Option<String> {
        let unit = project.unit_for_chapter(chapter)?;
        let index = (chapter - 1) / CHAPTERS_PER_UNIT;
        let first = index * CHAPTERS_PER_UNIT + 1;
        let mut block = format!(
            "【当前章节核心小故事】\n第{}-{}章对应：小故事{}《{}》",
            first,
            first + CHAPTERS_PER_UNIT - 1,
            index + 1,
            unit.title()
        );
        if !unit.group_title().is_empty() {
            block.push_str(&format!("\n所属中故事：{}", unit.group_title()));
        }
        if !unit.body().is_empty() {
            block.push_str(&format!(
                "\n内容：{}",
                truncate_with_marker(unit.body(), self.budget.unit_body_chars)
            ));
        }
        block.push_str(&format!(
            "\n重要提示：第{}章起的内容必须严格围绕这个小故事展开，不得提前写入后续小故事的情节。",
            chapter
        ));
        Some(block)
    }
}
