//! Credential store layer
//!
//! The core only talks to `CredentialStore`; which backend sits behind it is
//! decided by the service bootstrap.

pub mod credential_repo;
pub mod memory_store;
pub mod timeout_store;

pub use credential_repo::PgCredentialStore;
pub use memory_store::MemoryCredentialStore;
pub use timeout_store::TimeoutStore;

use crate::{
    error::AppError,
    models::credential::{Credential, CredentialUpdate},
};
use async_trait::async_trait;

/// Message reported when the unique username constraint is hit.
pub const USERNAME_TAKEN_MESSAGE: &str = "Username is already taken by another account.";

/// Durable credential records keyed by a unique, case-sensitive username.
///
/// Each call is an atomic single-record read or write.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AppError>;

    /// Insert a new record; fails with `AppError::Conflict` if the username exists.
    async fn create(&self, credential: Credential) -> Result<Credential, AppError>;

    /// Apply a profile update, returning the updated record if one matched.
    async fn update_by_username(
        &self,
        username: &str,
        update: &CredentialUpdate,
    ) -> Result<Option<Credential>, AppError>;

    /// Readiness check.
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
