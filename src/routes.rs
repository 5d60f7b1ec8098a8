//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};

use crate::{
    auth::{require_access_token, require_password, require_refresh_token},
    handlers,
    middleware::{payload_limit_middleware, request_tracking_middleware, AppState},
    validation::{
        user_check_schema, user_login_schema, user_register_schema, user_update_schema,
        validate_request, SchemaGuard,
    },
};

/// 创建应用路由
///
/// 每个路由上的中间件顺序：校验在最外层，认证在内层，最后才是处理器。
pub fn create_router(state: Arc<AppState>) -> Router {
    let authenticator = state.authenticator.clone();
    let guard = |schema| SchemaGuard::new(schema, state.store.clone());

    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    let user_routes = Router::new()
        .route(
            "/users/register",
            post(handlers::user::register)
                .layer(from_fn_with_state(guard(user_register_schema()), validate_request)),
        )
        .route(
            "/users/login",
            post(handlers::user::login)
                .layer(from_fn_with_state(authenticator.clone(), require_password))
                .layer(from_fn_with_state(guard(user_login_schema()), validate_request)),
        )
        .route(
            "/users/checkUserExists",
            post(handlers::user::check_user_exists)
                .layer(from_fn_with_state(guard(user_check_schema()), validate_request)),
        )
        .route(
            "/users/refreshToken",
            get(handlers::user::refresh_token)
                .layer(from_fn_with_state(authenticator.clone(), require_refresh_token)),
        )
        .route(
            "/users/profile",
            put(handlers::user::update_profile)
                .layer(from_fn_with_state(authenticator, require_access_token))
                .layer(from_fn_with_state(guard(user_update_schema()), validate_request)),
        );

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(state.config.server.body_limit_bytes))
        .layer(from_fn(payload_limit_middleware))
        .layer(from_fn(request_tracking_middleware))
        .with_state(state)
}
