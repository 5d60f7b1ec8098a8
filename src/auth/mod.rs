//! Authentication and authorization module

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod strategy;

pub use jwt::{Claims, ClaimData, TokenKind, TokenService};
pub use middleware::{
    extract_token, require_access_token, require_password, require_refresh_token, AuthContext,
};
pub use password::PasswordHasher;
pub use strategy::{AuthOutcome, Authenticator, Strategy, StrategyKind};
