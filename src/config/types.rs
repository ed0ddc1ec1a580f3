//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 文本生成后端配置
    #[serde(default)]
    pub llm: LlmConfig,

    /// 批量生成配置
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 上下文预算配置
    #[serde(default)]
    pub context: ContextConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 项目与小故事接口的请求体上限（MB）
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

fn default_max_body_mb() -> usize {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_mb: default_max_body_mb(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb * 1024 * 1024
    }
}

/// 文本生成后端配置（OpenAI 兼容接口）
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// 接口基础 URL
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 非流式请求超时时间（秒）
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// 非流式请求的最大重试次数
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,

    /// 使用进程内的模拟生成器（本地调试）
    #[serde(default)]
    pub fake: bool,
}

fn default_llm_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_llm_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f32 {
    1.2
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_llm_timeout() -> u64 {
    300
}

fn default_llm_retries() -> u32 {
    1
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            api_key: None,
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
            fake: false,
        }
    }
}

/// 批量生成配置
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// 启动生成所需的最少小故事数
    #[serde(default = "default_min_units")]
    pub min_units: usize,

    /// false 时使用非流式调用
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// 流式响应两个增量之间的最长静默时间（秒）
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// 每批持久化后的等待时间（毫秒）
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// 每批完成后自动导出纯文本
    #[serde(default = "default_true")]
    pub auto_export: bool,
}

fn default_min_units() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_idle_timeout() -> u64 {
    120
}

fn default_settle_delay() -> u64 {
    200
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_units: default_min_units(),
            streaming: true,
            idle_timeout_secs: default_idle_timeout(),
            settle_delay_ms: default_settle_delay(),
            auto_export: true,
        }
    }
}

/// 上下文预算配置（字符数）
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_world_chars")]
    pub world_setting_chars: usize,

    #[serde(default = "default_character_chars")]
    pub character_sheet_chars: usize,

    #[serde(default = "default_plot_chars")]
    pub plot_outline_chars: usize,

    #[serde(default = "default_anchor_min")]
    pub anchor_min_chars: usize,

    #[serde(default = "default_anchor_max")]
    pub anchor_max_chars: usize,

    /// 前情提要上限
    #[serde(default = "default_memory_chars")]
    pub memory_chars: usize,
}

fn default_world_chars() -> usize {
    1000
}

fn default_character_chars() -> usize {
    800
}

fn default_plot_chars() -> usize {
    600
}

fn default_anchor_min() -> usize {
    400
}

fn default_anchor_max() -> usize {
    900
}

fn default_memory_chars() -> usize {
    3000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            world_setting_chars: default_world_chars(),
            character_sheet_chars: default_character_chars(),
            plot_outline_chars: default_plot_chars(),
            anchor_min_chars: default_anchor_min(),
            anchor_max_chars: default_anchor_max(),
            memory_chars: default_memory_chars(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/chapterforge.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 纯文本导出目录
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("data/exports")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
