//! Credential records as held by the credential store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored account credential.
///
/// `hash_cost` records the work factor the hash was produced with. It is
/// informational: verification reads the parameters from the PHC string in
/// `password_hash`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub hash_cost: i32,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        username: String,
        password_hash: String,
        hash_cost: i32,
        full_name: Option<String>,
        phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            hash_cost,
            full_name,
            phone,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile fields that may change after registration.
///
/// Username and password are immutable through this path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialUpdate {
    pub full_name: String,
    pub phone: String,
}
