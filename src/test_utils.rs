pub mod test_helpers {
    use crate::config::Settings;
    use crate::services::email_service::{EmailError, EmailService};
    use crate::services::password::hash_password;
    use crate::AppState;
    use async_trait::async_trait;
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    };

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    pub fn test_settings() -> Settings {
        Settings {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            base_url: "http://shop.test".to_string(),
            environment: "test".to_string(),
            cors_origins: "*".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 30 * 24 * 3600,
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SentKind {
        Verification,
        PasswordReset,
    }

    #[derive(Debug, Clone)]
    pub struct SentEmail {
        pub kind: SentKind,
        pub to: String,
        pub token: String,
    }

    /// Email sender that keeps every message in memory and can be switched
    /// into a failing mode.
    #[derive(Default)]
    pub struct RecordingEmailService {
        sent: Mutex<Vec<SentEmail>>,
        failing: AtomicBool,
    }

    impl RecordingEmailService {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn sent(&self) -> Vec<SentEmail> {
            self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
        }

        /// Token of the most recent message of `kind` sent to `to`.
        pub fn last_token(&self, kind: SentKind, to: &str) -> Option<String> {
            self.sent()
                .into_iter()
                .rev()
                .find(|email| email.kind == kind && email.to == to)
                .map(|email| email.token)
        }

        fn record(&self, kind: SentKind, to: &str, token: &str) -> Result<(), EmailError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(EmailError::SendFailed("recording sender set to fail".to_string()));
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(SentEmail {
                    kind,
                    to: to.to_string(),
                    token: token.to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl EmailService for RecordingEmailService {
        async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), EmailError> {
            self.record(SentKind::Verification, to_email, token)
        }

        async fn send_password_reset_email(
            &self,
            to_email: &str,
            token: &str,
        ) -> Result<(), EmailError> {
            self.record(SentKind::PasswordReset, to_email, token)
        }
    }

    /// Fully wired state over a fresh in-memory database.
    pub async fn create_test_state() -> Result<(AppState, Arc<RecordingEmailService>), sqlx::Error> {
        let pool = create_test_db().await?;
        let email = RecordingEmailService::new();
        let state = AppState::new(pool, test_settings(), email.clone());
        Ok((state, email))
    }

    /// Insert a test user with hashed password
    pub async fn insert_test_user(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password: &str,
        active: bool,
        staff: bool,
    ) -> Result<i64, sqlx::Error> {
        let password_hash = hash_password(password)
            .map_err(|e| sqlx::Error::Configuration(e.to_string().into()))?;

        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, is_active, is_staff) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(active)
        .bind(staff)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Moves both token timestamps of a user `secs` into the past.
    pub async fn age_user_tokens(pool: &SqlitePool, user_id: i64, secs: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_token_created_at = verification_token_created_at - ?,
                reset_token_created_at = reset_token_created_at - ?
            WHERE id = ?
            "#,
        )
        .bind(secs)
        .bind(secs)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn create_test_category(pool: &SqlitePool, title: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO categories (title, slug) VALUES (?, ?)")
            .bind(title)
            .bind(title.to_lowercase().replace(' ', "-"))
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn create_test_brand(pool: &SqlitePool, name: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO brands (name, slug) VALUES (?, ?)")
            .bind(name)
            .bind(name.to_lowercase().replace(' ', "-"))
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Create an available product under a fresh category and brand
    pub async fn create_test_product(
        pool: &SqlitePool,
        title: &str,
        price: i64,
        inventory: i64,
    ) -> Result<i64, sqlx::Error> {
        let category_id = create_test_category(pool, &format!("{} category", title)).await?;
        let brand_id = create_test_brand(pool, &format!("{} brand", title)).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO products (title, slug, description, price, category_id, brand_id, inventory)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(title.to_lowercase().replace(' ', "-"))
        .bind("Test product description")
        .bind(price)
        .bind(category_id)
        .bind(brand_id)
        .bind(inventory)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
