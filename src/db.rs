//! PostgreSQL 凭据存储的连接层
//! 连接池构建、内嵌迁移、连通性探测

use crate::{config::DatabaseConfig, error::AppError};
use secrecy::ExposeSecret;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// 按配置构建连接池；后端为 postgres 时 url 必须存在
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let url = config.url.as_ref().ok_or(DbError::MissingUrl)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(url.expose_secret())
        .await
        .map_err(DbError::Connect)?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Credential store pool ready"
    );
    Ok(pool)
}

/// 执行 `migrations/` 下的内嵌迁移（credentials 表）
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Credential schema is up to date");
    Ok(())
}

/// 就绪探测：一次往返查询
pub async fn ping(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| {
            tracing::warn!("Credential store ping failed: {}", e);
            DbError::Unreachable(e)
        })
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database url is not configured")]
    MissingUrl,

    #[error("could not connect to the credential store: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("credential store is unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Connect(inner) | DbError::Unreachable(inner) => AppError::Database(inner),
            other => AppError::Internal(other.to_string()),
        }
    }
}
