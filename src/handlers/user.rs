//! 账户相关的 HTTP 处理器
//!
//! 请求体在到达这里之前已经过校验和认证中间件。

use axum::{extract::State, response::IntoResponse, Json};

use super::AppJson;
use std::sync::Arc;

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::{
        auth::RefreshResponse,
        user::{CheckUserRequest, CheckUserResponse, RegisterRequest, UpdateProfileRequest, UserResponse},
        ApiResponse,
    },
};

/// 注册
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.account_service.register(req).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(created))))
}

/// 登录（密码策略已通过）
pub async fn login(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let pair = state.account_service.login(&auth_context.identity).await?;
    tracing::info!(username = %auth_context.username(), "Login succeeded");
    Ok(Json(ApiResponse::success(pair)))
}

/// 用户名是否已存在
pub async fn check_user_exists(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CheckUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let is_existed = state.account_service.user_exists(&req.username).await?;
    Ok(Json(ApiResponse::success(CheckUserResponse { is_existed })))
}

/// 刷新访问令牌（刷新令牌策略已通过）
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let token = state
        .account_service
        .refresh_access_token(auth_context.username())
        .await?;
    Ok(Json(ApiResponse::success(RefreshResponse { token })))
}

/// 更新本人资料（访问令牌策略已通过）
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.account_service.update_profile(&auth_context, &req).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(updated))))
}
