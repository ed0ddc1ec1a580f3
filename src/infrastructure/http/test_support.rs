//! 测试用的完整应用：内存数据库 + Fake 生成后端 + 临时导出目录

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;

use crate::application::{GenerationRunnerPort, ProgressSinkPort, TextGeneratorPort};
use crate::domain::generation::ContextBuilder;
use crate::infrastructure::adapters::{FakeChatClient, FakeChatClientConfig, TextFileExporter};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::http::server::{HttpServer, ServerConfig, DEFAULT_MAX_BODY_BYTES};
use crate::infrastructure::http::state::AppState;
use crate::infrastructure::memory::InMemorySessionManager;
use crate::infrastructure::persistence::sqlite::{
    create_test_pool, SqliteChapterStore, SqliteProjectRepository,
};
use crate::infrastructure::worker::{
    BatchOrchestrator, BatchOrchestratorConfig, StreamingClientConfig, StreamingGenerationClient,
};

pub struct TestApp {
    pub router: Router,
    pub fake: Arc<FakeChatClient>,
    _export_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_body_limit(DEFAULT_MAX_BODY_BYTES).await
    }

    pub async fn with_body_limit(max_body_bytes: usize) -> Self {
        let pool = create_test_pool().await;
        let export_dir = TempDir::new().unwrap();

        let project_repo = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let chapter_store = Arc::new(SqliteChapterStore::new(pool));
        let sessions = Arc::new(InMemorySessionManager::new());
        let publisher = Arc::new(EventPublisher::new());
        let exporter = Arc::new(TextFileExporter::new(export_dir.path(), true));
        let sink: Arc<dyn ProgressSinkPort> = publisher.clone();
        let fake = Arc::new(FakeChatClient::new(FakeChatClientConfig::default()));
        let generator: Arc<dyn TextGeneratorPort> = fake.clone();

        let client = Arc::new(StreamingGenerationClient::new(
            generator.clone(),
            sink.clone(),
            StreamingClientConfig::default(),
        ));
        let runner: Arc<dyn GenerationRunnerPort> = Arc::new(BatchOrchestrator::new(
            BatchOrchestratorConfig {
                settle_delay: Duration::ZERO,
                ..Default::default()
            },
            ContextBuilder::default(),
            client,
            chapter_store.clone(),
            exporter.clone(),
            sessions.clone(),
            sink,
        ));

        let state = AppState::new(
            sessions,
            project_repo,
            chapter_store,
            exporter,
            runner,
            generator,
            publisher,
            ContextBuilder::default(),
            1,
        );
        let config = ServerConfig::default().with_max_body_bytes(max_body_bytes);
        let router = HttpServer::new(config, state).build_router();

        Self {
            router,
            fake,
            _export_dir: export_dir,
        }
    }
}
