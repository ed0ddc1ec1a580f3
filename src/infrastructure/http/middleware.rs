//! HTTP Middleware
//!
//! 处理器的业务错误统一以 HTTP 200 + errno 返回，并在 `ApiError` 转换时记录。
//! 非 200 的响应只会来自处理器之外：路由不存在、请求体解析失败、请求体超限、
//! WebSocket 升级失败。这里把这些拒绝连同耗时记录下来。

use std::time::Instant;

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// 框架层拒绝日志中间件
pub async fn rejection_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match status {
        StatusCode::PAYLOAD_TOO_LARGE => tracing::warn!(
            method = %method,
            uri = %uri,
            elapsed_ms,
            "Request body exceeds the configured limit"
        ),
        s if s.is_server_error() => tracing::error!(
            method = %method,
            uri = %uri,
            status = s.as_u16(),
            elapsed_ms,
            "Request failed outside the API handlers"
        ),
        s if s.is_client_error() => tracing::warn!(
            method = %method,
            uri = %uri,
            status = s.as_u16(),
            elapsed_ms,
            "Request rejected before reaching a handler"
        ),
        _ => tracing::trace!(method = %method, uri = %uri, elapsed_ms, "Request handled"),
    }

    response
}
