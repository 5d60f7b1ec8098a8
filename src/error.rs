//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 令牌校验失败时对外统一的消息
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token.";

tokio::task_local! {
    /// 当前请求的 request_id，由请求追踪中间件设置
    pub static REQUEST_ID: String;
}

/// 当前请求的 request_id；不在请求作用域内时生成新的
pub fn current_request_id() -> String {
    REQUEST_ID
        .try_with(|id| id.clone())
        .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string())
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Authentication(String),

    /// 签名、过期、结构任一校验失败都归为同一种错误
    #[error("Invalid token.")]
    TokenInvalid,

    #[error("{0}")]
    Conflict(String),

    #[error("Request body too large.")]
    PayloadTooLarge,

    /// 请求体无法解析为处理器期望的结构
    #[error("{0}")]
    MalformedBody(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Conflict(_) | AppError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Authentication(_) | AppError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::Timeout(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取对外的错误消息
    ///
    /// 5xx 目前仍会带出原始错误文本，调用方依赖这一行为。
    pub fn user_message(&self) -> String {
        match self {
            AppError::TokenInvalid => INVALID_TOKEN_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// 出错字段（仅校验错误）
    pub fn field(&self) -> Option<&str> {
        match self {
            AppError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    // 便捷方法
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn authentication(msg: &str) -> Self {
        AppError::Authentication(msg.to_string())
    }

    pub fn internal_error(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }

    pub fn timeout(msg: &str) -> Self {
        AppError::Timeout(msg.to_string())
    }
}

/// 错误响应 DTO
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = current_request_id();

        let error_response = ErrorResponse {
            status: "error",
            message: self.user_message(),
            field: self.field().map(str::to_string),
            request_id,
        };

        // 记录错误日志
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.request_id,
                "Application error"
            );
        } else {
            tracing::debug!(
                code = self.code(),
                message = %self,
                request_id = %error_response.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// 后台任务（密码哈希）失败
impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::authentication("User not found.").code(), 401);
        assert_eq!(AppError::TokenInvalid.code(), 401);
        assert_eq!(AppError::validation("user", "Username required.").code(), 400);
        assert_eq!(AppError::Conflict("taken".to_string()).code(), 400);
        assert_eq!(AppError::Config("missing".to_string()).code(), 500);
        assert_eq!(AppError::timeout("store").code(), 500);
        assert_eq!(AppError::PayloadTooLarge.code(), 413);
        assert_eq!(AppError::MalformedBody("bad".to_string()).code(), 400);
    }

    #[tokio::test]
    async fn test_request_id_follows_scope() {
        let id = REQUEST_ID
            .scope("req-42".to_string(), async { current_request_id() })
            .await;
        assert_eq!(id, "req-42");

        assert_ne!(current_request_id(), "req-42");
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let error = AppError::validation("pass", "Password required.");
        assert_eq!(error.user_message(), "Password required.");
        assert_eq!(error.field(), Some("pass"));
    }

    #[test]
    fn test_internal_message_carries_cause() {
        let error = AppError::internal_error("Auth user not found.");
        assert_eq!(error.user_message(), "Auth user not found.");
        assert_eq!(error.field(), None);
    }
}
