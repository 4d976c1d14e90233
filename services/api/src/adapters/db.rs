//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` and `AuthProvider` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use portfolio_core::domain::{check_new_credentials, AuthSession, AuthUser, PortfolioDocument};
use portfolio_core::ports::{
    AuthError, AuthProvider, AuthResult, DocumentStore, PortError, PortResult, PublishedPortfolio,
};
use sqlx::{types::Json, FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

use super::password::{hash_password, normalize_email, verify_password};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store and auth ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    session_ttl: Duration,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn open_session(&self, user: AuthUser) -> AuthResult<AuthSession> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(user.uid)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(auth_unexpected)?;
        Ok(AuthSession {
            token,
            user,
            expires_at,
        })
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn auth_unexpected(e: sqlx::Error) -> AuthError {
    error!("Auth query failed: {:?}", e);
    AuthError::Unexpected("Authentication service unavailable".to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct PortfolioRecord {
    owner_id: Uuid,
    document: Json<PortfolioDocument>,
    updated_at: DateTime<Utc>,
}
impl PortfolioRecord {
    fn to_domain(self) -> PortfolioDocument {
        let mut document = self.document.0;
        document.updated_at = Some(self.updated_at);
        document
    }

    fn to_published(self) -> PublishedPortfolio {
        PublishedPortfolio {
            owner: self.owner_id,
            document: self.to_domain(),
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> AuthUser {
        AuthUser {
            uid: self.user_id,
            display_name: self.display_name,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
    hashed_password: String,
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn get_portfolio(&self, owner: Uuid) -> PortResult<Option<PortfolioDocument>> {
        let record = sqlx::query_as::<_, PortfolioRecord>(
            "SELECT owner_id, document, updated_at FROM portfolios WHERE owner_id = $1",
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(PortfolioRecord::to_domain))
    }

    async fn put_portfolio(
        &self,
        owner: Uuid,
        document: &PortfolioDocument,
    ) -> PortResult<DateTime<Utc>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "INSERT INTO portfolios (owner_id, username, document) VALUES ($1, $2, $3) \
             ON CONFLICT (owner_id) DO UPDATE \
             SET username = EXCLUDED.username, document = EXCLUDED.document, updated_at = now() \
             RETURNING updated_at",
        )
        .bind(owner)
        .bind(&document.username)
        .bind(Json(document))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn find_by_username(&self, username: &str) -> PortResult<Vec<PublishedPortfolio>> {
        let records = sqlx::query_as::<_, PortfolioRecord>(
            "SELECT owner_id, document, updated_at FROM portfolios \
             WHERE username = $1 ORDER BY created_at ASC, owner_id ASC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .map(PortfolioRecord::to_published)
            .collect())
    }
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for DbAdapter {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthResult<AuthSession> {
        check_new_credentials(email, password)?;
        let hashed_password = hash_password(password)?;
        let display_name = display_name.map(str::trim).filter(|name| !name.is_empty());

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, display_name, hashed_password) \
             VALUES ($1, $2, $3, $4) RETURNING user_id, email, display_name",
        )
        .bind(Uuid::new_v4())
        .bind(normalize_email(email))
        .bind(display_name)
        .bind(&hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::EmailInUse,
            other => auth_unexpected(other),
        })?;

        self.open_session(record.to_domain()).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, display_name, hashed_password FROM users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(auth_unexpected)?
        .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &record.hashed_password) {
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(AuthUser {
            uid: record.user_id,
            display_name: record.display_name,
            email: record.email,
        })
        .await
    }

    async fn sign_out(&self, token: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(auth_unexpected)?;
        Ok(())
    }

    async fn current_user(&self, token: &str) -> AuthResult<Option<AuthUser>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.user_id, u.email, u.display_name FROM auth_sessions s \
             JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(auth_unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }
}
