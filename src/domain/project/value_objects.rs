//! Project Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 项目唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 书名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookName(String);

impl BookName {
    pub fn new(name: impl Into<String>) -> Result<Self, &'static str> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err("书名不能为空");
        }
        if name.chars().count() > 100 {
            return Err("书名长度不能超过100字符");
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 导出文件名：非字母数字、非汉字字符替换为下划线
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(&c) {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl std::fmt::Display for BookName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 项目大纲摘要（项目身份信息，进入上下文时不截断）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSummary {
    /// 核心概念
    #[serde(default)]
    pub logline: String,
    /// 人物关系
    #[serde(default)]
    pub characters: String,
    /// 世界观设定
    #[serde(default)]
    pub world: String,
    /// 主要冲突
    #[serde(default)]
    pub conflict: String,
    /// 金手指设定
    #[serde(default)]
    pub gimmick: String,
}

/// 项目设定文本（世界观、人物设定、情节架构）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryBible {
    #[serde(default)]
    pub world_setting: String,
    #[serde(default)]
    pub character_sheet: String,
    #[serde(default)]
    pub plot_outline: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_name_trims_and_rejects_empty() {
        assert_eq!(BookName::new("  长夜行  ").unwrap().as_str(), "长夜行");
        assert!(BookName::new("   ").is_err());
    }

    #[test]
    fn test_file_stem_sanitizes() {
        let name = BookName::new("长夜 行: Vol.1").unwrap();
        assert_eq!(name.file_stem(), "长夜_行__Vol_1");
    }
}
