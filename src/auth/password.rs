//! Password hashing and verification using Argon2id

use crate::{config::AppConfig, error::AppError};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Password hasher with configurable parameters
///
/// Cheap to clone so hashing can be moved onto the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
    memory_kib: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32, memory_kib: u32) -> Self {
        Self { cost, memory_kib }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.security.password_hash_cost,
            config.security.password_hash_memory_kib,
        )
    }

    /// Work factor applied to new hashes
    pub fn cost(&self) -> u32 {
        self.cost
    }

    fn argon2(&self) -> Result<Argon2<'static>, AppError> {
        let params = Params::new(self.memory_kib, self.cost, 1, None).map_err(|e| {
            AppError::Internal(format!("Invalid Argon2 params: {}", e))
        })?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password with the current cost
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal(format!("Failed to hash password: {}", e))
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Iteration cost embedded in a PHC hash string
    pub fn embedded_cost(hash: &str) -> Result<u32, AppError> {
        let parsed_hash = parse(hash)?;
        let params = Params::try_from(&parsed_hash).map_err(|e| {
            AppError::Internal(format!("Invalid Argon2 params in stored hash: {}", e))
        })?;
        Ok(params.t_cost())
    }

    /// Verify a password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch; only an unreadable hash is an error.
    /// Verification always uses the parameters embedded in the PHC string,
    /// so records hashed under an older cost keep verifying.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = parse(hash)?;

        let embedded = Self::embedded_cost(hash)?;
        if embedded < self.cost {
            tracing::debug!(embedded_cost = embedded, current_cost = self.cost, "Password hash below current cost");
        }

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash on the blocking pool
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    /// Verify on the blocking pool
    pub async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?
    }
}

fn parse(hash: &str) -> Result<PasswordHash<'_>, AppError> {
    PasswordHash::new(hash).map_err(|e| {
        tracing::debug!("Failed to parse password hash: {:?}", e);
        AppError::Internal(format!("Failed to parse password hash: {}", e))
    })
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(2, 19456)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1, 64)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let password = "TestPassword123!";

        let hash = hasher.hash(password).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(password, &hash).unwrap());
    }

    #[test]
    fn test_verify_fails_with_wrong_password() {
        let hasher = hasher();
        let hash = hasher.hash("TestPassword123!").unwrap();
        assert!(!hasher.verify("WrongPassword", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_different_each_time() {
        let hasher = hasher();
        let password = "TestPassword123!";

        let hash1 = hasher.hash(password).unwrap();
        let hash2 = hasher.hash(password).unwrap();

        // Hashes should be different due to salt
        assert_ne!(hash1, hash2);
        assert!(hasher.verify(password, &hash1).unwrap());
        assert!(hasher.verify(password, &hash2).unwrap());
    }

    #[test]
    fn test_older_cost_still_verifies() {
        let old = PasswordHasher::new(1, 64);
        let hash = old.hash("123456").unwrap();

        let current = PasswordHasher::new(3, 64);
        assert!(current.verify("123456", &hash).unwrap());
        assert_eq!(PasswordHasher::embedded_cost(&hash).unwrap(), 1);
    }

    #[test]
    fn test_garbage_hash_is_error() {
        assert!(hasher().verify("123456", "not-a-hash").is_err());
    }

    #[test]
    fn test_embedded_cost_wins_over_record_cost() {
        let hash = PasswordHasher::new(2, 64).hash("123456").unwrap();
        assert_eq!(PasswordHasher::embedded_cost(&hash).unwrap(), 2);

        // A verifier configured with a different cost still reads the hash's own parameters.
        assert!(PasswordHasher::new(1, 128).verify("123456", &hash).unwrap());
        assert!(PasswordHasher::embedded_cost("not-a-hash").is_err());
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hasher = hasher();
        let hash = hasher.hash_blocking("123456".to_string()).await.unwrap();
        assert!(hasher
            .verify_blocking("123456".to_string(), hash)
            .await
            .unwrap());
    }
}
