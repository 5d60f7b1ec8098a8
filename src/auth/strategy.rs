//! Authentication strategies
//!
//! Each strategy turns one piece of request evidence into an outcome. The set
//! is closed: callers pick the variant they need at the call site.

use crate::{
    auth::{
        jwt::{TokenKind, TokenService},
        password::PasswordHasher,
    },
    error::{AppError, INVALID_TOKEN_MESSAGE},
    models::auth::AuthIdentity,
    repository::CredentialStore,
};
use std::{fmt, sync::Arc};

pub const USER_NOT_FOUND_MESSAGE: &str = "User not found.";
pub const BAD_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Missing credentials.";
pub const MISSING_TOKEN_MESSAGE: &str = "No auth token";

/// Strategy name, as used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Password,
    AccessToken,
    RefreshToken,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Password => "password",
            StrategyKind::AccessToken => "access-token",
            StrategyKind::RefreshToken => "refresh-token",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A strategy together with the evidence it consumes
#[derive(Clone)]
pub enum Strategy {
    Password {
        username: Option<String>,
        password: Option<String>,
    },
    AccessToken { bearer: Option<String> },
    RefreshToken { bearer: Option<String> },
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Password { .. } => StrategyKind::Password,
            Strategy::AccessToken { .. } => StrategyKind::AccessToken,
            Strategy::RefreshToken { .. } => StrategyKind::RefreshToken,
        }
    }
}

impl fmt::Debug for Strategy {
    // Evidence stays out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy").field("kind", &self.kind()).finish()
    }
}

/// Outcome of an invoked strategy.
///
/// Unexpected failures are reported as `Err(AppError)` by
/// [`Authenticator::authenticate`], never folded into `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(AuthIdentity),
    Rejected(String),
}

impl AuthOutcome {
    fn rejected(reason: &str) -> Self {
        AuthOutcome::Rejected(reason.to_string())
    }
}

/// Runs strategies against the credential store and token service
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher,
        }
    }

    pub async fn authenticate(&self, strategy: Strategy) -> Result<AuthOutcome, AppError> {
        let kind = strategy.kind();
        let result = match strategy {
            Strategy::Password { username, password } => {
                let username = username.filter(|u| !u.is_empty());
                let password = password.filter(|p| !p.is_empty());
                match (username, password) {
                    (Some(username), Some(password)) => self.password(username, password).await,
                    _ => Ok(AuthOutcome::rejected(MISSING_CREDENTIALS_MESSAGE)),
                }
            }
            Strategy::AccessToken { bearer } => self.bearer(bearer, TokenKind::Access).await,
            Strategy::RefreshToken { bearer } => self.bearer(bearer, TokenKind::Refresh).await,
        };

        match &result {
            Ok(AuthOutcome::Authenticated(identity)) => {
                tracing::debug!(strategy = %kind, username = %identity.username, "Authenticated");
            }
            Ok(AuthOutcome::Rejected(reason)) => {
                tracing::debug!(strategy = %kind, reason = %reason, "Authentication rejected");
            }
            Err(e) => {
                tracing::error!(strategy = %kind, error = %e, "Authentication errored");
            }
        }

        result
    }

    async fn password(&self, username: String, password: String) -> Result<AuthOutcome, AppError> {
        let Some(credential) = self.store.find_by_username(&username).await? else {
            return Ok(AuthOutcome::rejected(USER_NOT_FOUND_MESSAGE));
        };

        let matches = self
            .hasher
            .verify_blocking(password, credential.password_hash.clone())
            .await?;

        if !matches {
            return Ok(AuthOutcome::rejected(BAD_CREDENTIALS_MESSAGE));
        }

        Ok(AuthOutcome::Authenticated(AuthIdentity::from(&credential)))
    }

    async fn bearer(&self, bearer: Option<String>, kind: TokenKind) -> Result<AuthOutcome, AppError> {
        let Some(token) = bearer.filter(|t| !t.is_empty()) else {
            return Ok(AuthOutcome::rejected(MISSING_TOKEN_MESSAGE));
        };

        let claims = match self.tokens.verify(&token, kind) {
            Ok(claims) => claims,
            Err(AppError::TokenInvalid) => return Ok(AuthOutcome::rejected(INVALID_TOKEN_MESSAGE)),
            Err(e) => return Err(e),
        };

        let Some(identity) = claims.data.identity() else {
            return Ok(AuthOutcome::rejected(INVALID_TOKEN_MESSAGE));
        };

        // 用户不存在时与无效令牌返回同样的消息
        if self.store.find_by_username(&identity.username).await?.is_none() {
            return Ok(AuthOutcome::rejected(INVALID_TOKEN_MESSAGE));
        }

        Ok(AuthOutcome::Authenticated(match kind {
            TokenKind::Access => identity,
            TokenKind::Refresh => AuthIdentity::username_only(identity.username),
        }))
    }
}
