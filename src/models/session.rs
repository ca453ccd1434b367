use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub id: i64,
    pub token_hash: String,
    pub user_id: i64,
    pub refresh_token_id: Option<i64>,
    pub expires_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub token_hash: String,
    pub user_id: i64,
    pub expires_at: i64,
    pub revoked_at: Option<i64>,
    pub created_at: i64,
}

impl RefreshToken {
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// A freshly minted credential pair. The raw values leave the server once.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: i64,
}
