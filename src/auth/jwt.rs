//! JWT token generation and validation
//! Two independent token families: short-lived access tokens and long-lived
//! refresh tokens, each with its own secret and claim shape.

use crate::{
    config::AppConfig,
    error::AppError,
    models::auth::AuthIdentity,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Which token family a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Signed claims: a `data` payload plus issue and expiry timestamps
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims<T> {
    pub data: T,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

/// Decoded `data` payload.
///
/// Fields are optional on the way in so that a token with a missing username
/// can be told apart from a token that fails to decode at all.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClaimData {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
}

impl ClaimData {
    /// Identity carried by the token, if it names a user.
    pub fn identity(&self) -> Option<AuthIdentity> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        Some(AuthIdentity {
            username: username.to_string(),
            phone: self.phone.clone(),
            full_name: self.fullname.clone(),
        })
    }
}

#[derive(Serialize)]
struct RefreshData<'a> {
    username: &'a str,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Token service
///
/// A missing secret is only reported when a token of that kind is issued or
/// verified, not at construction.
pub struct TokenService {
    access: Option<SigningKeys>,
    access_token_exp_secs: u64,
    refresh: Option<SigningKeys>,
    refresh_token_exp_secs: u64,
}

impl TokenService {
    pub fn new(
        access_secret: Option<&str>,
        access_token_exp_secs: u64,
        refresh_secret: Option<&str>,
        refresh_token_exp_secs: u64,
    ) -> Self {
        Self {
            access: access_secret.filter(|s| !s.is_empty()).map(SigningKeys::from_secret),
            access_token_exp_secs,
            refresh: refresh_secret.filter(|s| !s.is_empty()).map(SigningKeys::from_secret),
            refresh_token_exp_secs,
        }
    }

    /// Create token service from config
    pub fn from_config(config: &AppConfig) -> Self {
        let security = &config.security;
        Self::new(
            security.access_token_secret.as_ref().map(|s| s.expose_secret().as_str()),
            security.access_token_exp_secs,
            security.refresh_token_secret.as_ref().map(|s| s.expose_secret().as_str()),
            security.refresh_token_exp_secs,
        )
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_token_exp_secs
    }

    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_token_exp_secs
    }

    fn keys(&self, kind: TokenKind) -> Result<&SigningKeys, AppError> {
        let keys = match kind {
            TokenKind::Access => self.access.as_ref(),
            TokenKind::Refresh => self.refresh.as_ref(),
        };
        keys.ok_or_else(|| {
            AppError::Config(format!("{} token secret is not configured", kind.as_str()))
        })
    }

    fn sign<T: Serialize>(&self, kind: TokenKind, data: T, ttl_secs: u64) -> Result<String, AppError> {
        let keys = self.keys(kind)?;
        let now = Utc::now();
        let expiration = now + Duration::seconds(ttl_secs as i64);

        let claims = Claims {
            data,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
            tracing::error!("Failed to encode {} token: {:?}", kind.as_str(), e);
            AppError::Internal(format!("Failed to encode {} token: {}", kind.as_str(), e))
        })
    }

    /// Issue an access token carrying the full identity
    pub fn issue_access(&self, identity: &AuthIdentity) -> Result<String, AppError> {
        self.sign(TokenKind::Access, identity, self.access_token_exp_secs)
    }

    /// Issue a refresh token carrying only the username
    pub fn issue_refresh(&self, identity: &AuthIdentity) -> Result<String, AppError> {
        let data = RefreshData {
            username: &identity.username,
        };
        self.sign(TokenKind::Refresh, data, self.refresh_token_exp_secs)
    }

    /// Validate a token of the given family
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims<ClaimData>, AppError> {
        let keys = self.keys(kind)?;
        decode_claims(token, &keys.decoding)
    }

    /// Validate a token against an explicit secret
    pub fn verify_with_secret(token: &str, secret: &str) -> Result<Claims<ClaimData>, AppError> {
        decode_claims(token, &DecodingKey::from_secret(secret.as_bytes()))
    }
}

fn decode_claims(token: &str, key: &DecodingKey) -> Result<Claims<ClaimData>, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    Ok(decode::<Claims<ClaimData>>(token, key, &validation)
        .map_err(|e| {
            // 过期、篡改、结构错误对调用方一律不区分
            tracing::debug!("Token validation failed: {:?}", e);
            AppError::TokenInvalid
        })?
        .claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ACCESS_SECRET: &str = "test-access-secret";
    const REFRESH_SECRET: &str = "test-refresh-secret";

    fn service() -> TokenService {
        TokenService::new(Some(ACCESS_SECRET), 900, Some(REFRESH_SECRET), 604800)
    }

    fn identity() -> AuthIdentity {
        AuthIdentity {
            username: "testuser".to_string(),
            phone: Some("08412345678".to_string()),
            full_name: Some("Test".to_string()),
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let service = service();
        let token = service.issue_access(&identity()).unwrap();

        let claims = service.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.data.identity(), Some(identity()));
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_refresh_token_carries_username_only() {
        let service = service();
        let token = service.issue_refresh(&identity()).unwrap();

        let claims = service.verify(&token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.data.username.as_deref(), Some("testuser"));
        assert!(claims.data.phone.is_none());
        assert!(claims.data.fullname.is_none());
    }

    #[test]
    fn test_token_family_validation() {
        let service = service();

        let access_token = service.issue_access(&identity()).unwrap();
        assert!(matches!(
            service.verify(&access_token, TokenKind::Refresh),
            Err(AppError::TokenInvalid)
        ));

        let refresh_token = service.issue_refresh(&identity()).unwrap();
        assert!(matches!(
            service.verify(&refresh_token, TokenKind::Access),
            Err(AppError::TokenInvalid)
        ));
    }

    #[test]
    fn test_verify_with_explicit_secret() {
        let service = service();
        let token = service.issue_access(&identity()).unwrap();

        assert!(TokenService::verify_with_secret(&token, ACCESS_SECRET).is_ok());
        assert!(TokenService::verify_with_secret(&token, REFRESH_SECRET).is_err());
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let service = TokenService::new(None, 900, Some(REFRESH_SECRET), 604800);

        assert!(matches!(service.issue_access(&identity()), Err(AppError::Config(_))));
        assert!(service.issue_refresh(&identity()).is_ok());
    }

    #[test]
    fn test_expired_token_fails() {
        let now = Utc::now().timestamp();
        let claims = json!({"data": {"username": "testuser"}, "iat": now - 120, "exp": now - 60});
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            service().verify(&token, TokenKind::Access),
            Err(AppError::TokenInvalid)
        ));
    }

    #[test]
    fn test_token_without_data_fails() {
        let now = Utc::now().timestamp();
        let claims = json!({"sub": "testuser", "iat": now, "exp": now + 60});
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(service().verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_claim_without_username_has_no_identity() {
        let now = Utc::now().timestamp();
        let claims = json!({"data": {"phone": "08412345678"}, "iat": now, "exp": now + 60});
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .unwrap();

        let decoded = service().verify(&token, TokenKind::Access).unwrap();
        assert!(decoded.data.identity().is_none());
    }

    #[test]
    fn test_invalid_token_fails() {
        let service = service();
        assert!(service.verify("invalid_token", TokenKind::Access).is_err());
        assert!(service.verify("invalid_token", TokenKind::Refresh).is_err());
    }
}
