use crate::models::session::{AccessToken, RefreshToken, TokenPair};
use crate::services::token_issuer;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

const ACCESS_PREFIX: &str = "at_";
const REFRESH_PREFIX: &str = "rt_";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Token is invalid")]
    InvalidToken,
    #[error("Token has expired")]
    Expired,
    #[error("Token has been revoked")]
    Revoked,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Issues and checks access/refresh credential pairs.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait SessionIssuer: Send + Sync {
    async fn issue_for(&self, user_id: i64) -> Result<TokenPair, SessionError>;

    /// Mints a new access token from an unrevoked, unexpired refresh token.
    /// Returns the token and its expiry as a unix timestamp.
    async fn refresh(&self, refresh_token: &str) -> Result<(String, i64), SessionError>;

    /// Blacklists a refresh token owned by `user_id`.
    async fn revoke(&self, user_id: i64, refresh_token: &str) -> Result<(), SessionError>;

    /// Resolves an access token to its user id.
    async fn authenticate(&self, access_token: &str) -> Result<i64, SessionError>;
}

/// Hash a token using SHA-256; only digests are stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct SqliteSessionIssuer {
    pool: SqlitePool,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl SqliteSessionIssuer {
    pub fn new(pool: SqlitePool, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            pool,
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    async fn insert_access_token(
        &self,
        user_id: i64,
        refresh_token_id: Option<i64>,
        now: i64,
    ) -> Result<(String, i64), SessionError> {
        let token = format!("{}{}", ACCESS_PREFIX, token_issuer::issue());
        let expires_at = now + self.access_ttl_secs;

        sqlx::query(
            r#"
            INSERT INTO access_tokens (token_hash, user_id, refresh_token_id, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(refresh_token_id)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok((token, expires_at))
    }

    async fn find_refresh_token(&self, token: &str) -> Result<RefreshToken, SessionError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, token_hash, user_id, expires_at, revoked_at, created_at
            FROM refresh_tokens
            WHERE token_hash = ?
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SessionError::InvalidToken)
    }

    /// Removes expired access tokens and refresh tokens that can no longer be used.
    pub async fn purge_expired(&self) -> Result<u64, SessionError> {
        let now = Utc::now().timestamp();

        let access = sqlx::query("DELETE FROM access_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(access.rows_affected() + refresh.rows_affected())
    }
}

#[async_trait]
impl SessionIssuer for SqliteSessionIssuer {
    async fn issue_for(&self, user_id: i64) -> Result<TokenPair, SessionError> {
        let now = Utc::now().timestamp();
        let refresh_token = format!("{}{}", REFRESH_PREFIX, token_issuer::issue());

        let result = sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(hash_token(&refresh_token))
        .bind(user_id)
        .bind(now + self.refresh_ttl_secs)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let (access_token, access_expires_at) = self
            .insert_access_token(user_id, Some(result.last_insert_rowid()), now)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<(String, i64), SessionError> {
        let stored = self.find_refresh_token(refresh_token).await?;
        let now = Utc::now().timestamp();

        if stored.is_revoked() {
            return Err(SessionError::Revoked);
        }
        if stored.is_expired(now) {
            return Err(SessionError::Expired);
        }

        self.insert_access_token(stored.user_id, Some(stored.id), now)
            .await
    }

    async fn revoke(&self, user_id: i64, refresh_token: &str) -> Result<(), SessionError> {
        let stored = self.find_refresh_token(refresh_token).await?;
        let now = Utc::now().timestamp();

        if stored.user_id != user_id {
            return Err(SessionError::InvalidToken);
        }
        if stored.is_revoked() {
            return Err(SessionError::Revoked);
        }
        if stored.is_expired(now) {
            return Err(SessionError::Expired);
        }

        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(now)
        .bind(stored.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SessionError::Revoked);
        }

        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<i64, SessionError> {
        let record = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT id, token_hash, user_id, refresh_token_id, expires_at, created_at
            FROM access_tokens
            WHERE token_hash = ?
            "#,
        )
        .bind(hash_token(access_token))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SessionError::InvalidToken)?;

        if record.expires_at < Utc::now().timestamp() {
            return Err(SessionError::Expired);
        }

        Ok(record.user_id)
    }
}
