use crate::models::user::{NewUser, User};
use async_trait::async_trait;
use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("User not found")]
    NotFound,
    #[error("User already exists")]
    AlreadyExists,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, first_name, last_name,
    is_active, is_staff, is_superuser, date_joined,
    email_verification_token, verification_token_created_at,
    reset_token, reset_token_created_at
"#;

/// Credential store.
///
/// Token consumption is a single `UPDATE ... RETURNING` that matches and
/// clears the token in one write, so a verification or reset token succeeds
/// at most once when requests race on the same row.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &NewUser, token_created_at: i64) -> RepositoryResult<User>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Activates the inactive user holding `token` if it was issued after
    /// `issued_after`, clearing the token in the same write.
    async fn consume_verification_token(
        &self,
        token: &str,
        issued_after: i64,
    ) -> RepositoryResult<Option<User>>;

    /// Overwrites any outstanding reset token for the user.
    async fn set_reset_token(&self, id: i64, token: &str, created_at: i64)
        -> RepositoryResult<()>;

    async fn find_by_reset_token(
        &self,
        token: &str,
        issued_after: i64,
    ) -> RepositoryResult<Option<User>>;

    /// Stores `password_hash` for the user holding `token` and clears the
    /// token, provided it was issued after `issued_after`.
    async fn consume_reset_token(
        &self,
        token: &str,
        issued_after: i64,
        password_hash: &str,
    ) -> RepositoryResult<Option<User>>;

    async fn set_active(&self, id: i64, active: bool) -> RepositoryResult<()>;
    async fn update_password(&self, id: i64, password_hash: &str) -> RepositoryResult<()>;
    async fn delete_user(&self, id: i64) -> RepositoryResult<()>;
    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, condition: &str, value: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, condition);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, user: &NewUser, token_created_at: i64) -> RepositoryResult<User> {
        let token_created_at = user
            .email_verification_token
            .as_ref()
            .map(|_| token_created_at);

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                username, email, password_hash, first_name, last_name,
                is_active, is_staff, is_superuser,
                email_verification_token, verification_token_created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(&user.email_verification_token)
        .bind(token_created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => {
                let id = res.last_insert_rowid();
                self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
            }
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::AlreadyExists),
            Err(e) => Err(RepositoryError::Database(e)),
        }
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.find_one("username", username).await
    }

    async fn consume_verification_token(
        &self,
        token: &str,
        issued_after: i64,
    ) -> RepositoryResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET is_active = 1,
                email_verification_token = NULL,
                verification_token_created_at = NULL
            WHERE email_verification_token = ?
              AND is_active = 0
              AND verification_token_created_at > ?
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .bind(issued_after)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token: &str,
        created_at: i64,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = ?, reset_token_created_at = ? WHERE id = ?",
        )
        .bind(token)
        .bind(created_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        issued_after: i64,
    ) -> RepositoryResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE reset_token = ? AND reset_token_created_at > ?",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .bind(issued_after)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        issued_after: i64,
        password_hash: &str,
    ) -> RepositoryResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET password_hash = ?,
                reset_token = NULL,
                reset_token_created_at = NULL
            WHERE reset_token = ? AND reset_token_created_at > ?
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(password_hash)
            .bind(token)
            .bind(issued_after)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_active(&self, id: i64, active: bool) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_user(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>> {
        let limit = limit.unwrap_or(100);
        let offset = offset.unwrap_or(0);

        let sql = format!(
            "SELECT {} FROM users ORDER BY date_joined DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }
}
