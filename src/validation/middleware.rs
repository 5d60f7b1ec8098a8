//! 请求校验中间件
//! 在任何副作用之前拒绝不合法的请求体

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{Schema, Verdict};
use crate::{error::AppError, middleware::buffer_json_body, repository::CredentialStore};

/// 单个路由的校验状态：schema 加上异步规则需要的存储句柄
#[derive(Clone)]
pub struct SchemaGuard {
    schema: Arc<Schema>,
    store: Arc<dyn CredentialStore>,
}

impl SchemaGuard {
    pub fn new(schema: Schema, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            schema: Arc::new(schema),
            store,
        }
    }
}

/// 校验通过才调用下游；否则返回第一个字段错误
pub async fn validate_request(
    State(guard): State<SchemaGuard>,
    req: Request,
    next: Next,
) -> Response {
    let (req, body) = match buffer_json_body(req).await {
        Ok(buffered) => buffered,
        Err(e) => return e.into_response(),
    };

    match guard.schema.evaluate(body, guard.store.as_ref()).await {
        Ok(Verdict::Accepted(_)) => next.run(req).await,
        Ok(Verdict::Rejected(violation)) => {
            tracing::debug!(
                schema = guard.schema.name,
                field = %violation.field,
                message = %violation.message,
                "Validation failed"
            );
            AppError::from(violation).into_response()
        }
        Err(e) => e.into_response(),
    }
}
