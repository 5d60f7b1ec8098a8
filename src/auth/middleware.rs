//! 认证中间件
//! 把策略的结果转换为请求上下文或统一的错误响应

use crate::{
    auth::strategy::{AuthOutcome, Authenticator, Strategy, StrategyKind},
    error::AppError,
    middleware::buffer_json_body,
    models::auth::AuthIdentity,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: AuthIdentity,
    pub strategy: StrategyKind,
}

impl AuthContext {
    pub fn username(&self) -> &str {
        &self.identity.username
    }
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::authentication("Unauthorized."))
    }
}

/// 从 Authorization 头提取 Bearer 令牌（scheme 不区分大小写）
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 执行策略：成功时附加上下文并继续，否则直接返回错误响应
async fn run_strategy(
    authenticator: &Authenticator,
    strategy: Strategy,
    mut req: Request,
    next: Next,
) -> Response {
    let kind = strategy.kind();

    match authenticator.authenticate(strategy).await {
        Ok(AuthOutcome::Authenticated(identity)) => {
            req.extensions_mut().insert(AuthContext {
                identity,
                strategy: kind,
            });
            next.run(req).await
        }
        Ok(AuthOutcome::Rejected(reason)) => AppError::Authentication(reason).into_response(),
        Err(cause) => cause.into_response(),
    }
}

/// 用户名密码认证（读取请求体中的 username / password）
pub async fn require_password(
    State(authenticator): State<Arc<Authenticator>>,
    req: Request,
    next: Next,
) -> Response {
    let (req, body) = match buffer_json_body(req).await {
        Ok(buffered) => buffered,
        Err(e) => return e.into_response(),
    };

    let field = |name: &str| body.get(name).and_then(|v| v.as_str()).map(str::to_string);
    let strategy = Strategy::Password {
        username: field("username"),
        password: field("password"),
    };

    run_strategy(&authenticator, strategy, req, next).await
}

/// 访问令牌认证
pub async fn require_access_token(
    State(authenticator): State<Arc<Authenticator>>,
    req: Request,
    next: Next,
) -> Response {
    let strategy = Strategy::AccessToken {
        bearer: extract_token(req.headers()),
    };
    run_strategy(&authenticator, strategy, req, next).await
}

/// 刷新令牌认证
pub async fn require_refresh_token(
    State(authenticator): State<Arc<Authenticator>>,
    req: Request,
    next: Next,
) -> Response {
    let strategy = Strategy::RefreshToken {
        bearer: extract_token(req.headers()),
    };
    run_strategy(&authenticator, strategy, req, next).await
}
