//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                  GET   健康检查
//! - /api/project/create        POST  创建项目
//! - /api/project/get           POST  获取项目详情
//! - /api/project/list          GET   列出所有项目
//! - /api/project/delete        POST  删除项目
//! - /api/project/chapters      POST  获取章节正文
//! - /api/project/export        POST  导出纯文本
//! - /api/project/units/add     POST  追加结构化小故事
//! - /api/project/units/import  POST  从细纲文本导入小故事
//! - /api/project/units/generate POST 由模型拆分中故事生成小故事
//! - /api/generation/start      POST  开始生成（续写/重写）
//! - /api/generation/cancel     POST  取消生成
//! - /api/generation/status     POST  查询会话状态
//! - /api/generation/sessions   POST  列出项目的会话
//! - /api/generation/reset      POST  重置生成状态
//! - /api/generation/context    POST  预览批次上下文
//! - /ws/session/{id}           WS    会话生命周期事件
//! - /ws/events                 WS    全局会话事件

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
///
/// 项目与小故事接口携带世界观和细纲全文，请求体上限为 `max_body_bytes`，其余接口沿用默认上限
pub fn create_routes(max_body_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes(max_body_bytes))
        .route("/ws/session/:session_id", get(handlers::websocket_handler))
        .route("/ws/events", get(handlers::global_websocket_handler))
}

/// API 路由
fn api_routes(max_body_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest(
            "/project",
            project_routes().layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .nest("/generation", generation_routes())
}

/// Project 路由
fn project_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_project))
        .route("/get", post(handlers::get_project))
        .route("/list", get(handlers::list_projects))
        .route("/delete", post(handlers::delete_project))
        .route("/chapters", post(handlers::get_chapters))
        .route("/export", post(handlers::export_project))
        .route("/units/add", post(handlers::add_units))
        .route("/units/import", post(handlers::import_units))
        .route("/units/generate", post(handlers::generate_units))
}

/// Generation 路由
fn generation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start", post(handlers::start_generation))
        .route("/cancel", post(handlers::cancel_generation))
        .route("/status", post(handlers::generation_status))
        .route("/sessions", post(handlers::list_sessions))
        .route("/reset", post(handlers::reset_generation))
        .route("/context", post(handlers::preview_context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::FakeReply;
    use crate::infrastructure::http::test_support::TestApp;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Value {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_with_units(router: &Router) -> String {
        let created = call(
            router,
            "POST",
            "/api/project/create",
            Some(json!({
                "book_name": "雾港纪事",
                "bible": {"world_setting": "港口城市常年起雾。"}
            })),
        )
        .await;
        assert_eq!(created["errno"], 0);
        let project_id = created["data"]["id"].as_str().unwrap().to_string();

        let imported = call(
            router,
            "POST",
            "/api/project/units/import",
            Some(json!({
                "project_id": project_id,
                "group_id": "macro_1",
                "group_title": "初到雾港",
                "text": "小故事1：登岸\n主角在雾中登岸。\n小故事2：旧友\n码头遇见旧友。"
            })),
        )
        .await;
        assert_eq!(imported["errno"], 0);
        assert_eq!(imported["data"]["total_units"], 2);
        assert_eq!(imported["data"]["total_chapters"], 4);

        project_id
    }

    #[tokio::test]
    async fn test_ping() {
        let app = TestApp::new().await;
        let router = &app.router;
        let json = call(router, "GET", "/api/ping", None).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "chapterforge");
        assert_eq!(json["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_generation_round_trip_over_http() {
        let app = TestApp::new().await;
        let router = &app.router;
        let project_id = create_with_units(router).await;

        let started = call(
            router,
            "POST",
            "/api/generation/start",
            Some(json!({"project_id": project_id})),
        )
        .await;
        assert_eq!(started["errno"], 0);
        assert_eq!(started["data"]["start_chapter"], 1);
        assert_eq!(started["data"]["total_batches"], 1);
        let session_id = started["data"]["session_id"].as_str().unwrap().to_string();

        let mut status = Value::Null;
        for _ in 0..100 {
            status = call(
                router,
                "POST",
                "/api/generation/status",
                Some(json!({"session_id": session_id})),
            )
            .await;
            if status["data"]["status"] == "completed" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status["data"]["status"], "completed");

        let chapters = call(
            router,
            "POST",
            "/api/project/chapters",
            Some(json!({"project_id": project_id})),
        )
        .await;
        assert_eq!(chapters["data"]["total"], 4);
        assert_eq!(chapters["data"]["chapters"][0]["number"], 1);

        let project = call(
            router,
            "POST",
            "/api/project/get",
            Some(json!({"project_id": project_id})),
        )
        .await;
        assert_eq!(project["data"]["contiguous_completed"], 4);
        assert!(project["data"]["next_start_chapter"].is_null());
        assert!(project["data"]["active_session_id"].is_null());

        let exported = call(
            router,
            "POST",
            "/api/project/export",
            Some(json!({"project_id": project_id})),
        )
        .await;
        assert_eq!(exported["errno"], 0);
        assert!(exported["data"]["content"]
            .as_str()
            .unwrap()
            .starts_with("雾港纪事"));
    }

    #[tokio::test]
    async fn test_start_without_units_is_rejected() {
        let app = TestApp::new().await;
        let router = &app.router;
        let created = call(
            router,
            "POST",
            "/api/project/create",
            Some(json!({"book_name": "空书"})),
        )
        .await;

        let started = call(
            router,
            "POST",
            "/api/generation/start",
            Some(json!({"project_id": created["data"]["id"]})),
        )
        .await;
        assert_eq!(started["errno"], 400);
        assert!(started["data"].is_null());
    }

    #[tokio::test]
    async fn test_even_start_chapter_is_rejected() {
        let app = TestApp::new().await;
        let router = &app.router;
        let project_id = create_with_units(router).await;

        let started = call(
            router,
            "POST",
            "/api/generation/start",
            Some(json!({"project_id": project_id, "from_chapter": 2})),
        )
        .await;
        assert_eq!(started["errno"], 400);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = TestApp::new().await;
        let router = &app.router;
        let status = call(
            router,
            "POST",
            "/api/generation/status",
            Some(json!({"session_id": "missing"})),
        )
        .await;
        assert_eq!(status["errno"], 404);
    }

    #[tokio::test]
    async fn test_context_preview() {
        let app = TestApp::new().await;
        let router = &app.router;
        let project_id = create_with_units(router).await;

        let preview = call(
            router,
            "POST",
            "/api/generation/context",
            Some(json!({"project_id": project_id, "start_chapter": 1})),
        )
        .await;
        assert_eq!(preview["errno"], 0);
        assert_eq!(preview["data"]["end_chapter"], 4);
        assert_eq!(preview["data"]["unit_start"], 0);
        assert_eq!(preview["data"]["unit_end"], 2);
        assert!(preview["data"]["payload"].as_str().unwrap().contains("登岸"));
    }

    #[tokio::test]
    async fn test_list_and_delete_project() {
        let app = TestApp::new().await;
        let router = &app.router;
        let project_id = create_with_units(router).await;

        let listed = call(router, "GET", "/api/project/list", None).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
        assert_eq!(listed["data"][0]["unit_count"], 2);

        let deleted = call(
            router,
            "POST",
            "/api/project/delete",
            Some(json!({"project_id": project_id})),
        )
        .await;
        assert_eq!(deleted["errno"], 0);

        let missing = call(
            router,
            "POST",
            "/api/project/get",
            Some(json!({"project_id": project_id})),
        )
        .await;
        assert_eq!(missing["errno"], 404);
    }

    #[tokio::test]
    async fn test_generate_units_over_http() {
        let app = TestApp::new().await;
        let router = &app.router;
        let fake = &app.fake;
        let created = call(
            router,
            "POST",
            "/api/project/create",
            Some(json!({"book_name": "雾港纪事"})),
        )
        .await;
        let project_id = created["data"]["id"].as_str().unwrap().to_string();

        fake.push_reply(FakeReply::Text(
            "【小故事1】登岸\n主角在雾中登岸。\n【小故事2】旧友\n码头遇见旧友。\n【小故事3】夜巡\n雾夜巡港。"
                .to_string(),
        ))
        .await;
        let generated = call(
            router,
            "POST",
            "/api/project/units/generate",
            Some(json!({
                "project_id": project_id,
                "group_id": "macro_1",
                "group_index": 1,
                "group_title": "初到雾港",
                "macro_story": "主角初到雾港，结识旧友并卷入港口怪事。",
                "unit_count": 3
            })),
        )
        .await;
        assert_eq!(generated["errno"], 0);
        assert_eq!(generated["data"]["added"], 3);
        assert_eq!(generated["data"]["total_chapters"], 6);

        let blank = call(
            router,
            "POST",
            "/api/project/units/generate",
            Some(json!({
                "project_id": project_id,
                "group_id": "macro_2",
                "macro_story": "  "
            })),
        )
        .await;
        assert_eq!(blank["errno"], 400);
    }
}
