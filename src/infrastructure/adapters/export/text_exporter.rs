//! Text File Exporter - 纯文本导出实现
//!
//! 实现 ChapterExporterPort trait

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{ChapterExporterPort, ExportError, ExportedText};
use crate::domain::project::{ChapterRecord, Project};

/// 纯文本导出器
///
/// 输出格式：首行书名，随后每章 `=== 第n章 [标题] ===` + 正文，章与章之间空行分隔
pub struct TextFileExporter {
    export_dir: PathBuf,
    write_to_disk: bool,
}

impl TextFileExporter {
    pub fn new(export_dir: impl AsRef<Path>, write_to_disk: bool) -> Self {
        Self {
            export_dir: export_dir.as_ref().to_path_buf(),
            write_to_disk,
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    fn render(project: &Project, chapters: &BTreeMap<u32, ChapterRecord>) -> String {
        let mut out = String::new();
        out.push_str(project.book_name().as_str());
        out.push_str("\n\n");

        for chapter in chapters.values() {
            out.push_str(&format!("=== {} ===\n", chapter.heading()));
            out.push_str(chapter.body().trim_end());
            out.push_str("\n\n");
        }
        out
    }
}

#[async_trait]
impl ChapterExporterPort for TextFileExporter {
    async fn export_as_text(
        &self,
        project: &Project,
        chapters: &BTreeMap<u32, ChapterRecord>,
    ) -> Result<ExportedText, ExportError> {
        if chapters.is_empty() {
            return Err(ExportError::Empty(project.id().to_string()));
        }

        let file_name = format!("{}.txt", project.book_name().file_stem());
        let bytes = Self::render(project, chapters).into_bytes();

        let path = if self.write_to_disk {
            fs::create_dir_all(&self.export_dir)
                .await
                .map_err(|e| ExportError::Io(e.to_string()))?;
            let path = self.export_dir.join(&file_name);
            fs::write(&path, &bytes)
                .await
                .map_err(|e| ExportError::Io(e.to_string()))?;

            tracing::debug!(
                path = %path.display(),
                chapters = chapters.len(),
                size = bytes.len(),
                "Exported chapters"
            );
            Some(path)
        } else {
            None
        };

        Ok(ExportedText {
            file_name,
            bytes,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::{BookName, OutlineSummary, StoryBible};
    use tempfile::TempDir;

    fn project() -> Project {
        Project::new(
            BookName::new("雾港/纪事").unwrap(),
            OutlineSummary::default(),
            StoryBible::default(),
        )
    }

    fn chapters() -> BTreeMap<u32, ChapterRecord> {
        let mut map = BTreeMap::new();
        map.insert(2, ChapterRecord::new(2, "夜航", "船离开了码头。\n"));
        map.insert(1, ChapterRecord::new(1, "雾起", "港口起雾了。"));
        map
    }

    #[tokio::test]
    async fn test_export_writes_file_in_chapter_order() {
        let dir = TempDir::new().unwrap();
        let exporter = TextFileExporter::new(dir.path(), true);

        let exported = exporter.export_as_text(&project(), &chapters()).await.unwrap();
        assert_eq!(exported.file_name, "雾港_纪事.txt");

        let text = String::from_utf8(exported.bytes.clone()).unwrap();
        assert!(text.starts_with("雾港/纪事\n\n"));
        let first = text.find("=== 第1章 [雾起] ===").unwrap();
        let second = text.find("=== 第2章 [夜航] ===").unwrap();
        assert!(first < second);

        let path = exported.path.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), exported.bytes);
    }

    #[tokio::test]
    async fn test_export_in_memory_only() {
        let dir = TempDir::new().unwrap();
        let exporter = TextFileExporter::new(dir.path().join("out"), false);

        let exported = exporter.export_as_text(&project(), &chapters()).await.unwrap();
        assert!(exported.path.is_none());
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_export_empty_rejected() {
        let exporter = TextFileExporter::new("unused", false);
        let result = exporter.export_as_text(&project(), &BTreeMap::new()).await;
        assert!(matches!(result, Err(ExportError::Empty(_))));
    }
}
