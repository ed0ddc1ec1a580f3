//! Export Adapter - 章节导出实现

mod text_exporter;

pub use text_exporter::TextFileExporter;
