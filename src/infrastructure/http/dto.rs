//! Data Transfer Objects
//!
//! 统一响应信封，各资源的请求/响应结构定义在对应 handler 中

use serde::Serialize;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }

    /// 错误响应，`data` 为 null
    pub fn error(errno: i32, error: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(json["errno"], 0);
        assert_eq!(json["error"], "");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_error_envelope_has_null_data() {
        let json = serde_json::to_value(ApiResponse::<()>::error(409, "busy")).unwrap();
        assert_eq!(json["errno"], 409);
        assert!(json["data"].is_null());
    }

    #[test]
    fn test_ok_envelope_has_empty_object() {
        let json = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(json["data"], serde_json::json!({}));
    }
}
