//! 账户服务：注册、签发令牌、存在性检查、资料更新

use crate::{
    auth::{middleware::AuthContext, password::PasswordHasher, TokenService},
    error::AppError,
    models::{
        auth::{AuthIdentity, TokenPair},
        credential::{Credential, CredentialUpdate},
        user::{RegisterRequest, UpdateProfileRequest},
    },
    repository::CredentialStore,
};
use std::sync::Arc;

pub const AUTH_USER_NOT_FOUND_MESSAGE: &str = "Auth user not found.";
pub const FOREIGN_PROFILE_MESSAGE: &str = "You cannot update other person's data.";
pub const UPDATE_RETURNED_NOTHING_MESSAGE: &str = "Return null while updating user data.";

pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
}

impl AccountService {
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

    /// 注册新账户
    ///
    /// 唯一性以存储层约束为准，冲突时返回 `Conflict`。
    pub async fn register(&self, req: RegisterRequest) -> Result<Credential, AppError> {
        let password_hash = self.hasher.hash_blocking(req.pass.clone()).await?;
        let credential = req.into_credential(password_hash, self.hasher.cost() as i32);

        let created = self.store.create(credential).await?;
        tracing::info!(username = %created.username, "Account registered");
        Ok(created)
    }

    /// 为已通过密码认证的身份签发访问令牌和刷新令牌
    pub async fn login(&self, identity: &AuthIdentity) -> Result<TokenPair, AppError> {
        let credential = self.refetch(&identity.username).await?;
        let identity = AuthIdentity::from(&credential);

        Ok(TokenPair {
            token: self.tokens.issue_access(&identity)?,
            refresh_token: self.tokens.issue_refresh(&identity)?,
        })
    }

    /// 用刷新令牌换取新的访问令牌
    pub async fn refresh_access_token(&self, username: &str) -> Result<String, AppError> {
        let credential = self.refetch(username).await?;
        self.tokens.issue_access(&AuthIdentity::from(&credential))
    }

    pub async fn user_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.store.find_by_username(username).await?.is_some())
    }

    /// 更新自己的资料；只允许修改令牌持有者本人的记录
    pub async fn update_profile(
        &self,
        auth: &AuthContext,
        req: &UpdateProfileRequest,
    ) -> Result<Credential, AppError> {
        if auth.username() != req.user {
            tracing::debug!(
                caller = %auth.username(),
                target = %req.user,
                "Rejected cross-account profile update"
            );
            return Err(AppError::authentication(FOREIGN_PROFILE_MESSAGE));
        }

        self.store
            .update_by_username(&req.user, &CredentialUpdate::from(req))
            .await?
            .ok_or_else(|| AppError::internal_error(UPDATE_RETURNED_NOTHING_MESSAGE))
    }

    async fn refetch(&self, username: &str) -> Result<Credential, AppError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::internal_error(AUTH_USER_NOT_FOUND_MESSAGE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{StrategyKind, TokenKind},
        repository::MemoryCredentialStore,
    };
    use axum::http::StatusCode;

    fn service() -> (AccountService, Arc<MemoryCredentialStore>, Arc<TokenService>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let tokens = Arc::new(TokenService::new(Some("svc-access"), 60, Some("svc-refresh"), 3600));
        let service = AccountService::new(store.clone(), tokens.clone(), PasswordHasher::new(1, 64));
        (service, store, tokens)
    }

    fn register_request(user: &str) -> RegisterRequest {
        RegisterRequest {
            user: user.to_string(),
            pass: "123456".to_string(),
            pass_repeat: Some("123456".to_string()),
            name: "Ann".to_string(),
            phone: Some("08412345678".to_string()),
        }
    }

    fn context(username: &str) -> AuthContext {
        AuthContext {
            identity: AuthIdentity::username_only(username),
            strategy: StrategyKind::AccessToken,
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (service, store, _) = service();

        let created = service.register(register_request("ann@x.com")).await.unwrap();
        assert_ne!(created.password_hash, "123456");
        assert_eq!(created.hash_cost, 1);
        assert_eq!(PasswordHasher::embedded_cost(&created.password_hash).unwrap(), 1);

        let hasher = PasswordHasher::new(1, 64);
        assert!(hasher.verify("123456", &created.password_hash).unwrap());
        assert!(store.find_by_username("ann@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let (service, _, _) = service();
        service.register(register_request("ann@x.com")).await.unwrap();

        let err = service.register(register_request("ann@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_issues_both_tokens() {
        let (service, _, tokens) = service();
        service.register(register_request("ann@x.com")).await.unwrap();

        let pair = service
            .login(&AuthIdentity::username_only("ann@x.com"))
            .await
            .unwrap();

        let access = tokens.verify(&pair.token, TokenKind::Access).unwrap();
        assert_eq!(access.data.username.as_deref(), Some("ann@x.com"));
        assert_eq!(access.data.fullname.as_deref(), Some("Ann"));

        let refresh = tokens.verify(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.data.username.as_deref(), Some("ann@x.com"));
        assert!(refresh.data.fullname.is_none());
    }

    #[tokio::test]
    async fn test_login_for_vanished_user_is_internal() {
        let (service, _, _) = service();

        let err = service
            .login(&AuthIdentity::username_only("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), AUTH_USER_NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_user_exists_tracks_store() {
        let (service, store, _) = service();
        assert!(!service.user_exists("ann@x.com").await.unwrap());

        service.register(register_request("ann@x.com")).await.unwrap();
        assert!(service.user_exists("ann@x.com").await.unwrap());

        store.delete_by_username("ann@x.com").await;
        assert!(!service.user_exists("ann@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_requires_ownership() {
        let (service, store, _) = service();
        service.register(register_request("a@x.com")).await.unwrap();
        service.register(register_request("b@x.com")).await.unwrap();

        let req = UpdateProfileRequest {
            user: "b@x.com".to_string(),
            name: "Mallory".to_string(),
            phone: "08400000000".to_string(),
        };

        let err = service.update_profile(&context("a@x.com"), &req).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), FOREIGN_PROFILE_MESSAGE);

        let untouched = store.find_by_username("b@x.com").await.unwrap().unwrap();
        assert_eq!(untouched.full_name.as_deref(), Some("Ann"));
    }

    #[tokio::test]
    async fn test_update_profile_own_record() {
        let (service, _, _) = service();
        service.register(register_request("a@x.com")).await.unwrap();

        let req = UpdateProfileRequest {
            user: "a@x.com".to_string(),
            name: "Annie".to_string(),
            phone: "08412345679".to_string(),
        };

        let updated = service.update_profile(&context("a@x.com"), &req).await.unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Annie"));
        assert_eq!(updated.phone.as_deref(), Some("08412345679"));
    }

    #[tokio::test]
    async fn test_update_profile_missing_record_is_internal() {
        let (service, _, _) = service();

        let req = UpdateProfileRequest {
            user: "a@x.com".to_string(),
            name: "Annie".to_string(),
            phone: "08412345679".to_string(),
        };

        let err = service.update_profile(&context("a@x.com"), &req).await.unwrap_err();
        assert_eq!(err.user_message(), UPDATE_RETURNED_NOTHING_MESSAGE);
    }
}
