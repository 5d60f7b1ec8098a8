//! 数据模型模块

pub mod auth;
pub mod credential;
pub mod user;

use serde::Serialize;

/// 成功响应信封：`{"status": "success", "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}
