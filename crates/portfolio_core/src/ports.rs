//! crates/portfolio_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the document
//! store and the auth provider are external collaborators reached only through them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AuthSession, AuthUser, PortfolioDocument};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all store operations.
/// This abstracts away the specific errors from the backing database. A missing
/// portfolio is not an error; lookups return `None` or an empty list instead.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Auth failures. Their messages are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Password should be at least {} characters", crate::domain::MIN_PASSWORD_LEN)]
    WeakPassword,
    #[error("Email already in use")]
    EmailInUse,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Authentication service error: {0}")]
    Unexpected(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A published portfolio together with the account that owns it.
#[derive(Debug, Clone)]
pub struct PublishedPortfolio {
    pub owner: Uuid,
    pub document: PortfolioDocument,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches the owner's portfolio, `None` if they never saved one.
    async fn get_portfolio(&self, owner: Uuid) -> PortResult<Option<PortfolioDocument>>;

    /// Overwrites the owner's portfolio with `document` and returns the server timestamp
    /// recorded for the write. There is no merge and no version check.
    async fn put_portfolio(
        &self,
        owner: Uuid,
        document: &PortfolioDocument,
    ) -> PortResult<DateTime<Utc>>;

    /// All portfolios whose username equals `username`, oldest first.
    async fn find_by_username(&self, username: &str) -> PortResult<Vec<PublishedPortfolio>>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthResult<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    async fn sign_out(&self, token: &str) -> AuthResult<()>;

    /// Resolves a session token to its user; `None` once signed out or expired.
    async fn current_user(&self, token: &str) -> AuthResult<Option<AuthUser>>;
}
