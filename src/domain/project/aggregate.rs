//! Project Context - Aggregate Root

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookName, ChapterRecord, NarrativeUnit, OutlineSummary, ProjectError, ProjectId, StoryBible};

/// 每个小故事展开的章节数
pub const CHAPTERS_PER_UNIT: u32 = 2;

/// Project 聚合根
///
/// 不变量:
/// - 小故事按 (group_index, order_in_group, created_at) 全局排序，
///   该顺序是“哪个小故事对应哪两章”的唯一依据
/// - 章节按章节号稀疏存储，同一章节号至多一条记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    book_name: BookName,
    outline: OutlineSummary,
    bible: StoryBible,
    units: Vec<NarrativeUnit>,
    chapters: BTreeMap<u32, ChapterRecord>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Project {
    /// 创建新项目
    pub fn new(book_name: BookName, outline: OutlineSummary, bible: StoryBible) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            book_name,
            outline,
            bible,
            units: Vec::new(),
            chapters: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 从存储恢复
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: ProjectId,
        book_name: BookName,
        outline: OutlineSummary,
        bible: StoryBible,
        units: Vec<NarrativeUnit>,
        chapters: Vec<ChapterRecord>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut project = Self {
            id,
            book_name,
            outline,
            bible,
            units,
            chapters: chapters.into_iter().map(|c| (c.number(), c)).collect(),
            created_at,
            updated_at,
        };
        project.sort_units();
        project
    }

    fn sort_units(&mut self) {
        self.units.sort_by_key(|u| u.sort_key());
    }

    /// 追加小故事（重新排序）
    ///
    /// 已有章节的小故事位置固定，新小故事只能排在它们之后
    pub fn add_units(&mut self, units: Vec<NarrativeUnit>) -> Result<(), ProjectError> {
        let boundary = self.last_generated_unit().map(NarrativeUnit::sort_key);
        for unit in &units {
            if self.units.iter().any(|u| u.id() == unit.id()) {
                return Err(ProjectError::InvalidUnit(format!(
                    "重复的小故事 ID: {}",
                    unit.id()
                )));
            }
            if boundary.is_some_and(|b| unit.sort_key() <= b) {
                return Err(ProjectError::InsertBeforeGenerated(unit.title().to_string()));
            }
        }
        self.units.extend(units);
        self.sort_units();
        self.updated_at = Utc::now();
        Ok(())
    }

    // Getters
    pub fn id(&self) -> &ProjectId {
        &self.id
    }

    pub fn book_name(&self) -> &BookName {
        &self.book_name
    }

    pub fn outline(&self) -> &OutlineSummary {
        &self.outline
    }

    pub fn bible(&self) -> &StoryBible {
        &self.bible
    }

    pub fn units(&self) -> &[NarrativeUnit] {
        &self.units
    }

    pub fn chapters(&self) -> &BTreeMap<u32, ChapterRecord> {
        &self.chapters
    }

    pub fn chapter(&self, number: u32) -> Option<&ChapterRecord> {
        self.chapters.get(&number)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 计划总章节数
    pub fn total_chapters(&self) -> u32 {
        self.units.len() as u32 * CHAPTERS_PER_UNIT
    }

    /// 章节所属小故事（第 c 章 → 第 (c-1)/2 个小故事）
    pub fn unit_for_chapter(&self, chapter: u32) -> Option<&NarrativeUnit> {
        if chapter == 0 {
            return None;
        }
        self.units.get(((chapter - 1) / CHAPTERS_PER_UNIT) as usize)
    }

    /// 已有章节的最后一个小故事
    fn last_generated_unit(&self) -> Option<&NarrativeUnit> {
        let last = *self.chapters.keys().next_back()?;
        self.unit_for_chapter(last).or_else(|| self.units.last())
    }

    /// 从第 1 章起连续存在的章节数
    pub fn contiguous_completed(&self) -> u32 {
        let mut count = 0;
        while self.chapters.contains_key(&(count + 1)) {
            count += 1;
        }
        count
    }

    /// 是否存在章节号 >= `from` 的章节
    pub fn has_chapters_from(&self, from: u32) -> bool {
        self.chapters.range(from..).next().is_some()
    }

    /// 校验起始章节：范围内，且必须是小故事的第一章
    pub fn validate_start_chapter(&self, chapter: u32) -> Result<(), ProjectError> {
        let total = self.total_chapters();
        if chapter == 0 || chapter > total {
            return Err(ProjectError::ChapterOutOfRange {
                number: chapter,
                total,
            });
        }
        if (chapter - 1) % CHAPTERS_PER_UNIT != 0 {
            return Err(ProjectError::MisalignedChapter(chapter));
        }
        Ok(())
    }

    /// 写入章节（同号覆盖）
    pub fn record_chapters(&mut self, records: impl IntoIterator<Item = ChapterRecord>) {
        for record in records {
            self.chapters.insert(record.number(), record);
        }
        self.updated_at = Utc::now();
    }

    /// 删除章节号 >= `from` 的所有章节，返回删除数量
    pub fn discard_from(&mut self, from: u32) -> usize {
        let removed = self.chapters.split_off(&from).len();
        if removed > 0 {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// 用存储中的最新章节表替换内存中的章节
    pub fn replace_chapters(&mut self, chapters: BTreeMap<u32, ChapterRecord>) {
        self.chapters = chapters;
    }

    /// 清空所有章节
    pub fn clear_chapters(&mut self) {
        self.chapters.clear();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn unit(id: &str, group: u32, order: u32, offset_secs: i64) -> NarrativeUnit {
        let created = Utc::now() + Duration::seconds(offset_secs);
        NarrativeUnit::new(id, format!("标题{}", id), "内容", "g", group, "中故事", order, created)
            .unwrap()
    }

    fn project() -> Project {
        Project::new(
            BookName::new("测试书").unwrap(),
            OutlineSummary::default(),
            StoryBible::default(),
        )
    }

    #[test]
    fn test_units_sorted_by_group_then_order() {
        let mut p = project();
        p.add_units(vec![unit("b1", 2, 1, 0), unit("a2", 1, 2, 0), unit("a1", 1, 1, 5)])
            .unwrap();
        let ids: Vec<&str> = p.units().iter().map(|u| u.id()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1"]);
        assert_eq!(p.total_chapters(), 6);
        assert_eq!(p.unit_for_chapter(3).unwrap().id(), "a2");
        assert_eq!(p.unit_for_chapter(4).unwrap().id(), "a2");
        assert!(p.unit_for_chapter(7).is_none());
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let mut p = project();
        p.add_units(vec![unit("a1", 1, 1, 0)]).unwrap();
        assert!(p.add_units(vec![unit("a1", 1, 2, 0)]).is_err());
    }

    #[test]
    fn test_units_cannot_sort_before_generated_chapters() {
        let mut p = project();
        p.add_units(vec![unit("a2", 1, 2, 0), unit("b1", 2, 1, 0)]).unwrap();
        p.record_chapters((1..=2).map(|n| ChapterRecord::new(n, "t", "正文")));

        assert!(matches!(
            p.add_units(vec![unit("a1", 1, 1, 0)]),
            Err(ProjectError::InsertBeforeGenerated(_))
        ));
        assert_eq!(p.units().len(), 2);

        // 排在已生成小故事之后的位置仍可插入
        p.add_units(vec![unit("a3", 1, 3, 0)]).unwrap();
        let ids: Vec<&str> = p.units().iter().map(|u| u.id()).collect();
        assert_eq!(ids, vec!["a2", "a3", "b1"]);
    }

    #[test]
    fn test_contiguous_completed_and_discard() {
        let mut p = project();
        p.record_chapters((1..=4).chain(6..=7).map(|n| ChapterRecord::new(n, "t", "正文")));
        assert_eq!(p.contiguous_completed(), 4);
        assert!(p.has_chapters_from(5));
        assert_eq!(p.discard_from(5), 2);
        assert!(!p.has_chapters_from(5));
        assert_eq!(p.chapters().len(), 4);
    }

    #[test]
    fn test_validate_start_chapter() {
        let mut p = project();
        p.add_units(vec![unit("a1", 1, 1, 0), unit("a2", 1, 2, 0)]).unwrap();
        assert!(p.validate_start_chapter(1).is_ok());
        assert!(p.validate_start_chapter(3).is_ok());
        assert!(matches!(
            p.validate_start_chapter(2),
            Err(ProjectError::MisalignedChapter(2))
        ));
        assert!(matches!(
            p.validate_start_chapter(5),
            Err(ProjectError::ChapterOutOfRange { .. })
        ));
    }
}
