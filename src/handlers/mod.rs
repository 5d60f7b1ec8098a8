//! HTTP 处理器模块

pub mod health;
pub mod user;

use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use axum::Json;

use crate::error::AppError;

/// JSON 请求体提取器，拒绝时返回统一错误信封而不是纯文本
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), "JSON body rejected: {}", rejection.body_text());
                Err(AppError::MalformedBody(rejection.body_text()))
            }
        }
    }
}
