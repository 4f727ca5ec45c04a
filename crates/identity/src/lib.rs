//! Caller identity resolution for the Campus backend.
//!
//! Every REST and push operation runs on behalf of an authenticated user.
//! This crate resolves a bearer token to that user via the sessions table.
//! Session issuance beyond the minimal helper here (account registration,
//! login, password reset) is outside the chat subsystem.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use campus_config::AuthConfig;
use campus_database::{User, UserRepository};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
    #[error("user not found")]
    UserNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage error: {0}")]
    Store(String),
}

impl From<campus_database::StoreError> for AuthError {
    fn from(err: campus_database::StoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

/// A live authenticated session
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        let session_ttl = Duration::seconds(config.session_ttl_seconds as i64);
        Self { pool, session_ttl }
    }

    /// Resolve a bearer token to the user it belongs to.
    ///
    /// Expired sessions are removed as a side effect.
    pub async fn authenticate_token(&self, token: &str) -> Result<User, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidSession);
        }

        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;
        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let user = UserRepository::new(self.pool.clone())
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(user)
    }

    /// Mint a session for a user. Used by deployments that seed accounts
    /// out of band, and by tests.
    pub async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let token = random_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(user_id, "issued session");

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }

    /// Drop a session, invalidating its token
    pub async fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::SessionNotFound);
        }

        Ok(())
    }

    /// Load a user's profile by database ID
    pub async fn user_profile(&self, user_id: i64) -> Result<User, AuthError> {
        UserRepository::new(self.pool.clone())
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tokens_are_url_safe_and_distinct() {
        let a = random_token();
        let b = random_token();

        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
