//! ChapterForge - 长篇小说章节批量生成服务
//!
//! - Domain: project/, generation/ (Bounded Contexts)
//! - Application: commands, queries, ports
//! - Infrastructure: http, memory, worker, persistence, adapters, events

use std::sync::Arc;
use std::time::Duration;

use chapterforge::application::{GenerationRunnerPort, ProgressSinkPort, TextGeneratorPort};
use chapterforge::config::{load_config, print_config};
use chapterforge::domain::generation::{AnchorBounds, ContextBudget, ContextBuilder};
use chapterforge::infrastructure::adapters::{
    FakeChatClient, FakeChatClientConfig, HttpChatClient, HttpChatClientConfig, TextFileExporter,
};
use chapterforge::infrastructure::events::EventPublisher;
use chapterforge::infrastructure::http::{AppState, HttpServer, ServerConfig};
use chapterforge::infrastructure::memory::InMemorySessionManager;
use chapterforge::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteChapterStore, SqliteProjectRepository,
};
use chapterforge::infrastructure::worker::{
    BatchOrchestrator, BatchOrchestratorConfig, StreamingClientConfig, StreamingGenerationClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},chapterforge={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("ChapterForge - 章节批量生成服务");
    print_config(&config);

    // 确保数据目录存在
    tokio::fs::create_dir_all(&config.storage.export_dir).await?;
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 创建 Repository 适配器
    let project_repo = Arc::new(SqliteProjectRepository::new(pool.clone()));
    let chapter_store = Arc::new(SqliteChapterStore::new(pool));

    // 创建文本生成后端
    let generator: Arc<dyn TextGeneratorPort> = if config.llm.fake {
        Arc::new(FakeChatClient::new(FakeChatClientConfig::default()))
    } else {
        let llm = &config.llm;
        let mut llm_config = HttpChatClientConfig::new(&llm.base_url).with_model(&llm.model);
        if let Some(api_key) = &llm.api_key {
            llm_config = llm_config.with_api_key(api_key);
        }
        llm_config.temperature = llm.temperature;
        llm_config.max_tokens = llm.max_tokens;
        llm_config.timeout_secs = llm.timeout_secs;
        llm_config.max_retries = llm.max_retries;
        Arc::new(HttpChatClient::new(llm_config)?)
    };

    // 创建事件发布器与会话管理器
    let event_publisher = Arc::new(EventPublisher::new());
    let sink: Arc<dyn ProgressSinkPort> = event_publisher.clone();
    let session_manager = Arc::new(InMemorySessionManager::new());

    let exporter = Arc::new(TextFileExporter::new(&config.storage.export_dir, true));

    let ctx = &config.context;
    let context_builder = ContextBuilder::new(ContextBudget {
        world_setting_chars: ctx.world_setting_chars,
        character_sheet_chars: ctx.character_sheet_chars,
        plot_outline_chars: ctx.plot_outline_chars,
        ..Default::default()
    });

    // 创建流式客户端与批次编排器
    let client = Arc::new(StreamingGenerationClient::new(
        generator.clone(),
        sink.clone(),
        StreamingClientConfig {
            streaming: config.generation.streaming,
            idle_timeout: Duration::from_secs(config.generation.idle_timeout_secs),
        },
    ));
    let orchestrator_config = BatchOrchestratorConfig {
        settle_delay: Duration::from_millis(config.generation.settle_delay_ms),
        auto_export: config.generation.auto_export,
        anchor_bounds: AnchorBounds {
            min_chars: ctx.anchor_min_chars,
            max_chars: ctx.anchor_max_chars,
        },
        memory_chars: ctx.memory_chars,
    };
    let runner: Arc<dyn GenerationRunnerPort> = Arc::new(BatchOrchestrator::new(
        orchestrator_config,
        context_builder.clone(),
        client,
        chapter_store.clone(),
        exporter.clone(),
        session_manager.clone(),
        sink,
    ));

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port)
        .with_max_body_bytes(config.server.max_body_bytes());
    let state = AppState::new(
        session_manager,
        project_repo,
        chapter_store,
        exporter,
        runner,
        generator,
        event_publisher,
        context_builder,
        config.generation.min_units,
    );

    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c");
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
