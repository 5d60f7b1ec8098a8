//! HTTP 中间件
//! 应用状态、请求追踪、请求体缓冲

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::{Authenticator, PasswordHasher, TokenService},
    config::AppConfig,
    error::{AppError, REQUEST_ID},
    repository::{CredentialStore, TimeoutStore},
    services::AccountService,
};

/// 应用状态
///
/// 存储句柄由启动流程创建后显式传入，各组件在构造时拿到同一个句柄。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn CredentialStore>,
    pub tokens: Arc<TokenService>,
    pub authenticator: Arc<Authenticator>,
    pub account_service: Arc<AccountService>,
}

impl AppState {
    /// 组装所有服务；存储操作统一加上超时限制
    pub fn new(config: AppConfig, store: Arc<dyn CredentialStore>) -> Self {
        let store: Arc<dyn CredentialStore> = Arc::new(TimeoutStore::new(
            store,
            Duration::from_millis(config.database.operation_timeout_ms),
        ));
        let tokens = Arc::new(TokenService::from_config(&config));
        let hasher = PasswordHasher::from_config(&config);

        let authenticator = Arc::new(Authenticator::new(store.clone(), tokens.clone(), hasher));
        let account_service = Arc::new(AccountService::new(store.clone(), tokens.clone(), hasher));

        Self {
            config,
            store,
            tokens,
            authenticator,
            account_service,
        }
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        // 处理器中产生的错误响应使用同一个 request_id
        let mut response = REQUEST_ID.scope(request_id.clone(), next.run(req)).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            _ => "OTHER",
        };
        let status_class = match status {
            100..=299 => "2xx",
            300..=399 => "3xx",
            400 => "400",
            401 => "401",
            400..=499 => "4xx",
            _ => "5xx",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        // 在响应头中添加 trace_id
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 把请求体大小限制层直接返回的 413 转换为统一错误信封
pub async fn payload_limit_middleware(req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !has_json_content_type(response.headers()) {
        return AppError::PayloadTooLarge.into_response();
    }
    response
}

/// `application/json` 或 `application/*+json`
pub fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// 读取并缓冲请求体，返回重建后的请求和解析出的 JSON
///
/// 非 JSON 的 Content-Type、空请求体或非法 JSON 都视为 `null`，
/// 交给后续校验给出字段级错误。超出大小限制时返回 413。
pub async fn buffer_json_body(req: Request) -> Result<(Request, Value), AppError> {
    let (parts, body) = req.into_parts();

    let bytes = axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
        if is_length_limit(&e) {
            tracing::debug!("Request body exceeds the configured limit");
            AppError::PayloadTooLarge
        } else {
            tracing::debug!("Failed to read request body: {}", e);
            AppError::MalformedBody("Request body could not be read.".to_string())
        }
    })?;

    let value = if bytes.is_empty() || !has_json_content_type(&parts.headers) {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_extract_or_generate_trace_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "test-trace-123".parse().unwrap());

        let trace_id = extract_or_generate_trace_id(&headers);
        assert_eq!(trace_id, "test-trace-123");

        let headers = HeaderMap::new();
        let trace_id = extract_or_generate_trace_id(&headers);
        assert!(!trace_id.is_empty());
        assert_ne!(trace_id, "test-trace-123");
    }

    #[tokio::test]
    async fn test_buffer_json_body_keeps_bytes() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"ann"}"#))
            .unwrap();

        let (req, value) = buffer_json_body(req).await.unwrap();
        assert_eq!(value["username"], "ann");

        let bytes = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], br#"{"username":"ann"}"#);
    }

    #[tokio::test]
    async fn test_buffer_json_body_tolerates_garbage() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let (_, value) = buffer_json_body(req).await.unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_buffer_json_body_ignores_non_json_content_type() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"username":"ann"}"#))
            .unwrap();

        let (req, value) = buffer_json_body(req).await.unwrap();
        assert!(value.is_null());

        // 原始字节仍然保留给下游
        let bytes = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], br#"{"username":"ann"}"#);
    }

    #[tokio::test]
    async fn test_buffer_json_body_over_limit_is_413() {
        let limited = http_body_util::Limited::new(Body::from(vec![b'a'; 32]), 8);
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::new(limited))
            .unwrap();

        let err = buffer_json_body(req).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge));
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_json_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!has_json_content_type(&headers));

        headers.insert(header::CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        assert!(has_json_content_type(&headers));

        headers.insert(header::CONTENT_TYPE, "application/merge-patch+json".parse().unwrap());
        assert!(has_json_content_type(&headers));

        headers.insert(header::CONTENT_TYPE, "application/x-www-form-urlencoded".parse().unwrap());
        assert!(!has_json_content_type(&headers));
    }
}
