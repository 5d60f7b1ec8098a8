//! In-process credential store for development and tests

use crate::{
    error::AppError,
    models::credential::{Credential, CredentialUpdate},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CredentialStore, USERNAME_TAKEN_MESSAGE};

/// Username-keyed map guarded by a tokio `RwLock`.
///
/// The lock is only held inside a single operation, so `create` enforces
/// uniqueness atomically the same way a database constraint would.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a record. Deletion is never part of the account flows.
    pub async fn delete_by_username(&self, username: &str) -> bool {
        self.records.write().await.remove(username).is_some()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AppError> {
        Ok(self.records.read().await.get(username).cloned())
    }

    async fn create(&self, credential: Credential) -> Result<Credential, AppError> {
        let mut records = self.records.write().await;
        if records.contains_key(&credential.username) {
            return Err(AppError::Conflict(USERNAME_TAKEN_MESSAGE.to_string()));
        }
        records.insert(credential.username.clone(), credential.clone());
        Ok(credential)
    }

    async fn update_by_username(
        &self,
        username: &str,
        update: &CredentialUpdate,
    ) -> Result<Option<Credential>, AppError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(username).map(|record| {
            record.full_name = Some(update.full_name.clone());
            record.phone = Some(update.phone.clone());
            record.updated_at = Utc::now();
            record.clone()
        }))
    }
}
