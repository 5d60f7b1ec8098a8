//! Credential repository (数据库访问层)

use crate::{
    db,
    error::AppError,
    models::credential::{Credential, CredentialUpdate},
};
use async_trait::async_trait;
use sqlx::PgPool;

use super::{CredentialStore, USERNAME_TAKEN_MESSAGE};

pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 删除凭据（仅供运维和测试使用，核心流程从不删除）
    pub async fn delete_by_username(&self, username: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM credentials WHERE username = $1")
            .bind(username)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    /// 根据用户名查找凭据
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AppError> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT * FROM credentials WHERE username = $1"
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(credential)
    }

    /// 创建凭据，唯一约束冲突时返回 Conflict
    async fn create(&self, credential: Credential) -> Result<Credential, AppError> {
        let created = sqlx::query_as::<_, Credential>(
            r#"
            INSERT INTO credentials (id, username, password_hash, hash_cost, full_name, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#
        )
        .bind(credential.id)
        .bind(&credential.username)
        .bind(&credential.password_hash)
        .bind(credential.hash_cost)
        .bind(&credential.full_name)
        .bind(&credential.phone)
        .bind(credential.created_at)
        .bind(credential.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                tracing::warn!(username = %credential.username, "Unique username constraint hit on insert");
                AppError::Conflict(USERNAME_TAKEN_MESSAGE.to_string())
            }
            other => AppError::Database(other),
        })?;

        Ok(created)
    }

    /// 更新资料（仅全名与电话）
    async fn update_by_username(
        &self,
        username: &str,
        update: &CredentialUpdate,
    ) -> Result<Option<Credential>, AppError> {
        let credential = sqlx::query_as::<_, Credential>(
            r#"
            UPDATE credentials
            SET
                full_name = $2,
                phone = $3,
                updated_at = NOW()
            WHERE username = $1
            RETURNING *
            "#
        )
        .bind(username)
        .bind(&update.full_name)
        .bind(&update.phone)
        .fetch_optional(&self.db)
        .await?;

        Ok(credential)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(db::ping(&self.db).await?)
    }
}
