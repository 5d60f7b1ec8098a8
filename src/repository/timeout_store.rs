//! Bounded store operations
//!
//! Wraps any `CredentialStore` so that a stalled backend fails the request
//! with a timeout instead of hanging it.

use crate::{
    error::AppError,
    models::credential::{Credential, CredentialUpdate},
};
use async_trait::async_trait;
use std::{future::Future, sync::Arc, time::Duration};

use super::CredentialStore;

pub struct TimeoutStore {
    inner: Arc<dyn CredentialStore>,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn CredentialStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>> + Send,
    {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    operation,
                    timeout_ms = self.limit.as_millis() as u64,
                    "Credential store operation timed out"
                );
                Err(AppError::Timeout(format!(
                    "credential store {} did not complete within {}ms",
                    operation,
                    self.limit.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl CredentialStore for TimeoutStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AppError> {
        self.bounded("find_by_username", self.inner.find_by_username(username)).await
    }

    async fn create(&self, credential: Credential) -> Result<Credential, AppError> {
        self.bounded("create", self.inner.create(credential)).await
    }

    async fn update_by_username(
        &self,
        username: &str,
        update: &CredentialUpdate,
    ) -> Result<Option<Credential>, AppError> {
        self.bounded("update_by_username", self.inner.update_by_username(username, update))
            .await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.bounded("ping", self.inner.ping()).await
    }
}
