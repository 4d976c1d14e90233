//! services/api/src/adapters/memory.rs
//!
//! A process-local implementation of both ports. Used when no `DATABASE_URL` is
//! configured and by the tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use portfolio_core::domain::{check_new_credentials, AuthSession, AuthUser, PortfolioDocument};
use portfolio_core::ports::{
    AuthError, AuthProvider, AuthResult, DocumentStore, PortResult, PublishedPortfolio,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::password::{hash_password, normalize_email, verify_password};

struct StoredPortfolio {
    /// Insertion order, used to make username lookups deterministic.
    seq: u64,
    document: PortfolioDocument,
}

struct UserEntry {
    user: AuthUser,
    hashed_password: String,
}

#[derive(Default)]
struct Inner {
    portfolios: HashMap<Uuid, StoredPortfolio>,
    next_seq: u64,
    users: HashMap<Uuid, UserEntry>,
    emails: HashMap<String, Uuid>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
}

pub struct InMemoryAdapter {
    inner: RwLock<Inner>,
    session_ttl: Duration,
}

impl InMemoryAdapter {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            session_ttl,
        }
    }

    fn open_session(&self, inner: &mut Inner, user: AuthUser) -> AuthSession {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;
        inner
            .sessions
            .insert(token.clone(), (user.uid, expires_at));
        AuthSession {
            token,
            user,
            expires_at,
        }
    }
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new(Duration::days(30))
    }
}

#[async_trait]
impl DocumentStore for InMemoryAdapter {
    async fn get_portfolio(&self, owner: Uuid) -> PortResult<Option<PortfolioDocument>> {
        let inner = self.inner.read().await;
        Ok(inner.portfolios.get(&owner).map(|p| p.document.clone()))
    }

    async fn put_portfolio(
        &self,
        owner: Uuid,
        document: &PortfolioDocument,
    ) -> PortResult<DateTime<Utc>> {
        let mut inner = self.inner.write().await;
        let updated_at = Utc::now();
        let mut document = document.clone();
        document.updated_at = Some(updated_at);

        let seq = match inner.portfolios.get(&owner) {
            Some(existing) => existing.seq,
            None => {
                inner.next_seq += 1;
                inner.next_seq
            }
        };
        inner
            .portfolios
            .insert(owner, StoredPortfolio { seq, document });
        Ok(updated_at)
    }

    async fn find_by_username(&self, username: &str) -> PortResult<Vec<PublishedPortfolio>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<(u64, PublishedPortfolio)> = inner
            .portfolios
            .iter()
            .filter(|(_, p)| p.document.username == username)
            .map(|(owner, p)| {
                (
                    p.seq,
                    PublishedPortfolio {
                        owner: *owner,
                        document: p.document.clone(),
                    },
                )
            })
            .collect();
        matches.sort_by_key(|(seq, _)| *seq);
        Ok(matches.into_iter().map(|(_, p)| p).collect())
    }
}

#[async_trait]
impl AuthProvider for InMemoryAdapter {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthResult<AuthSession> {
        check_new_credentials(email, password)?;
        let email = normalize_email(email);
        let hashed_password = hash_password(password)?;

        let mut inner = self.inner.write().await;
        if inner.emails.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }
        let user = AuthUser {
            uid: Uuid::new_v4(),
            display_name: display_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            email: email.clone(),
        };
        inner.emails.insert(email, user.uid);
        inner.users.insert(
            user.uid,
            UserEntry {
                user: user.clone(),
                hashed_password,
            },
        );
        Ok(self.open_session(&mut inner, user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = normalize_email(email);
        let mut inner = self.inner.write().await;
        let entry = inner
            .emails
            .get(&email)
            .and_then(|uid| inner.users.get(uid))
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &entry.hashed_password) {
            return Err(AuthError::InvalidCredentials);
        }
        let user = entry.user.clone();
        Ok(self.open_session(&mut inner, user))
    }

    async fn sign_out(&self, token: &str) -> AuthResult<()> {
        self.inner.write().await.sessions.remove(token);
        Ok(())
    }

    async fn current_user(&self, token: &str) -> AuthResult<Option<AuthUser>> {
        let mut inner = self.inner.write().await;
        let Some((uid, expires_at)) = inner.sessions.get(token).copied() else {
            return Ok(None);
        };
        if expires_at <= Utc::now() {
            inner.sessions.remove(token);
            return Ok(None);
        }
        Ok(inner.users.get(&uid).map(|entry| entry.user.clone()))
    }
}
