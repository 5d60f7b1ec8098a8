//! 测试公共模块
//! 提供测试配置、应用构建和请求辅助函数
#![allow(dead_code)]

use account_auth::{
    config::{AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig, StoreBackend},
    middleware::AppState,
    repository::MemoryCredentialStore,
    routes,
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";

/// 创建测试配置（内存存储，低成本哈希）
pub fn create_test_config() -> AppConfig {
    let database_url = std::env::var("TEST_DATABASE_URL").ok().map(Secret::new);

    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
            body_limit_bytes: 64 * 1024,
        },
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: database_url,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
            operation_timeout_ms: 2000,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            access_token_secret: Some(Secret::new(ACCESS_SECRET.to_string())),
            access_token_exp_secs: 300,
            refresh_token_secret: Some(Secret::new(REFRESH_SECRET.to_string())),
            refresh_token_exp_secs: 3600,
            password_hash_cost: 1,
            password_hash_memory_kib: 64,
        },
    }
}

/// 测试应用：路由加上底层内存存储的句柄
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryCredentialStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(create_test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryCredentialStore::new());
        let state = Arc::new(AppState::new(config, store.clone()));
        let router = routes::create_router(state.clone());
        Self {
            router,
            state,
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, body, None)).await
    }

    pub async fn put_json(&self, uri: &str, body: Value, bearer: &str) -> (StatusCode, Value) {
        self.send(json_request(Method::PUT, uri, body, Some(bearer))).await
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// 注册一个账户，断言成功
    pub async fn register(&self, user: &str, pass: &str) -> Value {
        let (status, body) = self
            .post_json("/users/register", register_payload(user, pass))
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body
    }

    /// 登录并返回 (访问令牌, 刷新令牌)
    pub async fn login(&self, user: &str, pass: &str) -> (String, String) {
        let (status, body) = self
            .post_json(
                "/users/login",
                serde_json::json!({"username": user, "password": pass}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

pub fn register_payload(user: &str, pass: &str) -> Value {
    serde_json::json!({
        "user": user,
        "pass": pass,
        "pass_repeat": pass,
        "name": "testuser",
        "phone": "08412345678",
        "aff_id": "",
        "credit_rate": "100"
    })
}

pub fn json_request(method: Method, uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
