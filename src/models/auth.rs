//! Authentication-related models

use serde::{Deserialize, Serialize};

use super::credential::Credential;

/// Minimal identity carried inside a signed access token.
///
/// Never holds the password hash. Tokens minted by the refresh strategy carry
/// only `username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, rename = "fullname", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl AuthIdentity {
    pub fn username_only(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            phone: None,
            full_name: None,
        }
    }
}

impl From<&Credential> for AuthIdentity {
    fn from(credential: &Credential) -> Self {
        Self {
            username: credential.username.clone(),
            phone: credential.phone.clone(),
            full_name: credential.full_name.clone(),
        }
    }
}

/// Login response
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// Token refresh response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}
