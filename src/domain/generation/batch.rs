//! 批次规划
//!
//! 批次起点只由调用方传入的“已完成章节数”推导，不读取任何外部状态。

use serde::Serialize;

use crate::domain::project::CHAPTERS_PER_UNIT;

/// 单批次最大章节数
pub const BATCH_CHAPTER_CAP: u32 = 8;

/// 单批次最多覆盖的小故事数
pub const UNITS_PER_BATCH: u32 = BATCH_CHAPTER_CAP / CHAPTERS_PER_UNIT;

/// 批次计划（派生值，不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    pub start_chapter: u32,
    pub end_chapter: u32,
    pub size: u32,
}

/// 子单元：一次生成调用，对应一个小故事的两章
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubUnit {
    /// 小故事全局下标（0 起）
    pub unit_index: usize,
    pub first_chapter: u32,
    pub last_chapter: u32,
}

impl SubUnit {
    pub fn chapter_count(&self) -> u32 {
        self.last_chapter - self.first_chapter + 1
    }

    pub fn chapters(&self) -> Vec<u32> {
        (self.first_chapter..=self.last_chapter).collect()
    }
}

impl BatchPlan {
    /// 根据已完成章节数计算下一批次；全部完成时返回 None
    ///
    /// start = completed + 1，size = min(8, total - completed)
    pub fn next(completed: u32, total: u32) -> Option<Self> {
        if completed >= total {
            return None;
        }
        let size = BATCH_CHAPTER_CAP.min(total - completed);
        Some(Self {
            start_chapter: completed + 1,
            end_chapter: completed + size,
            size,
        })
    }

    /// 从 `completed` 开始还剩多少批次
    pub fn remaining_batches(completed: u32, total: u32) -> u32 {
        if completed >= total {
            return 0;
        }
        (total - completed).div_ceil(BATCH_CHAPTER_CAP)
    }

    /// 拆分为子单元
    pub fn sub_units(&self) -> Vec<SubUnit> {
        let mut units = Vec::new();
        let mut first = self.start_chapter;
        while first <= self.end_chapter {
            let last = (first + CHAPTERS_PER_UNIT - 1).min(self.end_chapter);
            units.push(SubUnit {
                unit_index: ((first - 1) / CHAPTERS_PER_UNIT) as usize,
                first_chapter: first,
                last_chapter: last,
            });
            first = last + 1;
        }
        units
    }
}

/// 将已完成章节数向下对齐到小故事边界
pub fn align_to_unit(completed: u32) -> u32 {
    completed - completed % CHAPTERS_PER_UNIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_is_completed_plus_one_for_every_count() {
        let total = 24;
        for completed in 0..total {
            let plan = BatchPlan::next(completed, total).unwrap();
            assert_eq!(plan.start_chapter, completed + 1);
            assert_eq!(plan.size, 8.min(total - completed));
            assert_eq!(plan.end_chapter, plan.start_chapter + plan.size - 1);
        }
        assert!(BatchPlan::next(total, total).is_none());
    }

    #[test]
    fn test_size_even_on_unit_boundaries() {
        for units in 1..=10u32 {
            let total = units * CHAPTERS_PER_UNIT;
            let mut completed = 0;
            while let Some(plan) = BatchPlan::next(completed, total) {
                assert_eq!(plan.size % 2, 0);
                assert_eq!(plan.sub_units().len() as u32, plan.size / 2);
                completed += plan.size;
            }
            assert_eq!(completed, total);
        }
    }

    #[test]
    fn test_sixteen_chapters_make_two_batches() {
        let first = BatchPlan::next(0, 16).unwrap();
        assert_eq!((first.start_chapter, first.end_chapter), (1, 8));
        let second = BatchPlan::next(8, 16).unwrap();
        assert_eq!((second.start_chapter, second.end_chapter), (9, 16));
        assert_eq!(BatchPlan::remaining_batches(0, 16), 2);
    }

    #[test]
    fn test_twelve_chapters_second_batch_is_four() {
        let plan = BatchPlan::next(8, 12).unwrap();
        assert_eq!(plan.start_chapter, 9);
        assert_eq!(plan.size, 4);
        let subs = plan.sub_units();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].unit_index, 4);
        assert_eq!(subs[1].chapters(), vec![11, 12]);
    }

    #[test]
    fn test_align_to_unit() {
        assert_eq!(align_to_unit(0), 0);
        assert_eq!(align_to_unit(5), 4);
        assert_eq!(align_to_unit(6), 6);
    }
}
