//! User-facing request/response shapes and their conversions to records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credential::{Credential, CredentialUpdate};

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub user: String,
    pub pass: String,
    #[serde(default)]
    pub pass_repeat: Option<String>,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Build the record to persist. Username, full name and phone are trimmed.
    pub fn into_credential(self, password_hash: String, hash_cost: i32) -> Credential {
        Credential::new(
            self.user.trim().to_string(),
            password_hash,
            hash_cost,
            Some(self.name.trim().to_string()),
            self.phone.map(|phone| phone.trim().to_string()),
        )
    }
}

/// Existence check payload
#[derive(Debug, Clone, Deserialize)]
pub struct CheckUserRequest {
    pub username: String,
}

/// Existence check response
#[derive(Debug, Serialize)]
pub struct CheckUserResponse {
    #[serde(rename = "isExisted")]
    pub is_existed: bool,
}

/// Profile update payload; `user` names the account being changed
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub user: String,
    pub name: String,
    pub phone: String,
}

impl From<&UpdateProfileRequest> for CredentialUpdate {
    fn from(req: &UpdateProfileRequest) -> Self {
        Self {
            full_name: req.name.clone(),
            phone: req.phone.trim().to_string(),
        }
    }
}

/// User response (without sensitive data)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "fullname")]
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Credential> for UserResponse {
    fn from(credential: Credential) -> Self {
        Self {
            id: credential.id,
            username: credential.username,
            full_name: credential.full_name,
            phone: credential.phone,
            created_at: credential.created_at,
            updated_at: credential.updated_at,
        }
    }
}
