//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `CHAPTERFORGE_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `CHAPTERFORGE_SERVER__PORT=8080`
/// - `CHAPTERFORGE_LLM__BASE_URL=https://api.deepseek.com/v1`
/// - `CHAPTERFORGE_LLM__API_KEY=sk-...`
/// - `CHAPTERFORGE_GENERATION__STREAMING=false`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5070)?
        .set_default("server.max_body_mb", 8)?
        .set_default("llm.base_url", "http://localhost:8000/v1")?
        .set_default("llm.model", "deepseek-chat")?
        .set_default("llm.temperature", 1.2)?
        .set_default("llm.max_tokens", 8192)?
        .set_default("llm.timeout_secs", 300)?
        .set_default("llm.max_retries", 1)?
        .set_default("llm.fake", false)?
        .set_default("generation.min_units", 1)?
        .set_default("generation.streaming", true)?
        .set_default("generation.idle_timeout_secs", 120)?
        .set_default("generation.settle_delay_ms", 200)?
        .set_default("generation.auto_export", true)?
        .set_default("context.world_setting_chars", 1000)?
        .set_default("context.character_sheet_chars", 800)?
        .set_default("context.plot_outline_chars", 600)?
        .set_default("context.anchor_min_chars", 400)?
        .set_default("context.anchor_max_chars", 900)?
        .set_default("context.memory_chars", 3000)?
        .set_default("database.path", "data/chapterforge.db")?
        .set_default("database.max_connections", 5)?
        .set_default("storage.export_dir", "data/exports")?
        .set_default("log.level", "info")?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        // 搜索默认配置文件
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 例如: CHAPTERFORGE_LLM__MODEL=gpt-4o
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("CHAPTERFORGE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.server.max_body_mb == 0 {
        return Err(ConfigError::ValidationError(
            "Server max_body_mb cannot be 0".to_string(),
        ));
    }

    if !config.llm.fake && config.llm.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "LLM base URL cannot be empty".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    let ctx = &config.context;
    let budgets = [
        ("context.world_setting_chars", ctx.world_setting_chars),
        ("context.character_sheet_chars", ctx.character_sheet_chars),
        ("context.plot_outline_chars", ctx.plot_outline_chars),
        ("context.anchor_min_chars", ctx.anchor_min_chars),
        ("context.anchor_max_chars", ctx.anchor_max_chars),
        ("context.memory_chars", ctx.memory_chars),
    ];
    if let Some((name, _)) = budgets.iter().find(|(_, value)| *value == 0) {
        return Err(ConfigError::ValidationError(format!("{} must be > 0", name)));
    }

    if ctx.anchor_min_chars > ctx.anchor_max_chars {
        return Err(ConfigError::ValidationError(format!(
            "context.anchor_min_chars ({}) exceeds context.anchor_max_chars ({})",
            ctx.anchor_min_chars, ctx.anchor_max_chars
        )));
    }

    if config.generation.streaming && config.generation.idle_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "generation.idle_timeout_secs cannot be 0 when streaming".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Server max body: {} MB", config.server.max_body_mb);
    if config.llm.fake {
        tracing::info!("LLM: fake generator");
    } else {
        tracing::info!("LLM URL: {}", config.llm.base_url);
        tracing::info!("LLM Model: {}", config.llm.model);
        tracing::info!("LLM API Key: {}", if config.llm.api_key.is_some() { "set" } else { "none" });
    }
    tracing::info!("Streaming: {}", config.generation.streaming);
    tracing::info!("Min Units: {}", config.generation.min_units);
    tracing::info!("Auto Export: {}", config.generation.auto_export);
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Export Directory: {:?}", config.storage.export_dir);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5070);
        assert_eq!(config.server.max_body_bytes(), 8 * 1024 * 1024);
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_body_limit() {
        let mut config = AppConfig::default();
        config.server.max_body_mb = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_llm_url_allowed_only_with_fake() {
        let mut config = AppConfig::default();
        config.llm.base_url = String::new();
        assert!(validate_config(&config).is_err());
        config.llm.fake = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_db_path() {
        let mut config = AppConfig::default();
        config.database.path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_inverted_anchor_bounds() {
        let mut config = AppConfig::default();
        config.context.anchor_min_chars = 1000;
        config.context.anchor_max_chars = 500;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_budget() {
        let mut config = AppConfig::default();
        config.context.plot_outline_chars = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("plot_outline_chars"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9000\n\n[llm]\nmodel = \"gpt-4o\"\n\n[generation]\nstreaming = false\n",
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.llm.model, "gpt-4o");
        assert!(!config.generation.streaming);
        assert_eq!(config.context.anchor_max_chars, 900);
    }
}
