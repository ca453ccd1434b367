//! Account lifecycle: registration, email verification, login/logout and
//! password reset.
//!
//! Verification and reset tokens are single-use. Consumption goes through
//! the repository's compare-and-swap operations, so a token that matched
//! once can never match again.

use crate::error::FieldErrors;
use crate::models::session::TokenPair;
use crate::models::user::{NewUser, User};
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::email_service::{EmailError, EmailService};
use crate::services::password::{hash_password, verify_password, HashingError};
use crate::services::session_service::{SessionError, SessionIssuer};
use crate::services::token_issuer;
use crate::services::user_service::{
    normalize_email, validate_email, validate_name, validate_username,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

const BLANK: &str = "This field may not be blank.";
const PASSWORD_MISMATCH: &str = "Passwords do not match";

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account is not active")]
    AccountInactive,
    #[error("Email not found")]
    EmailNotFound,
    #[error("Email delivery failed: {0}")]
    Delivery(#[from] EmailError),
    #[error("Logout failed")]
    LogoutFailed,
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error(transparent)]
    HashingError(#[from] HashingError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<FieldErrors> for AccountError {
    fn from(errors: FieldErrors) -> Self {
        AccountError::Validation(errors)
    }
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTokenStatus {
    pub email: String,
    pub token: String,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionIssuer>,
    email_service: Arc<dyn EmailService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionIssuer>,
        email_service: Arc<dyn EmailService>,
    ) -> Self {
        Self {
            users,
            sessions,
            email_service,
        }
    }

    /// Creates an inactive user and mails the verification link.
    ///
    /// The user row is committed before delivery is attempted. A delivery
    /// failure is returned to the caller and the inactive account remains.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AccountError> {
        let email = normalize_email(&request.email);
        let username = request.username.trim().to_string();
        let first_name = non_blank(request.first_name);
        let last_name = non_blank(request.last_name);

        let mut errors = FieldErrors::new();
        if let Err(msg) = validate_username(&username) {
            errors.add("username", msg);
        }
        if let Err(msg) = validate_email(&email) {
            errors.add("email", msg);
        }
        if request.password.is_empty() {
            errors.add("password", BLANK);
        } else if request.password != request.confirm_password {
            errors.add("password", PASSWORD_MISMATCH);
        }
        if let Err(msg) = validate_name(first_name.as_deref()) {
            errors.add("first_name", msg);
        }
        if let Err(msg) = validate_name(last_name.as_deref()) {
            errors.add("last_name", msg);
        }
        errors.into_result()?;

        let mut errors = FieldErrors::new();
        if self.users.find_by_email(&email).await?.is_some() {
            errors.add("email", "Email already registered");
        }
        if self.users.find_by_username(&username).await?.is_some() {
            errors.add("username", "Username already taken");
        }
        errors.into_result()?;

        let password_hash = hash_password(&request.password)?;
        let token = token_issuer::issue();

        let new_user = NewUser {
            username,
            email,
            password_hash,
            first_name,
            last_name,
            is_active: false,
            is_staff: false,
            is_superuser: false,
            email_verification_token: Some(token.clone()),
        };

        let user = match self
            .users
            .create_user(&new_user, Utc::now().timestamp())
            .await
        {
            Ok(user) => user,
            Err(RepositoryError::AlreadyExists) => {
                return Err(FieldErrors::single("email", "Email or username already registered").into())
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = user.id, "Registered user {}", user.username);

        if let Err(e) = self
            .email_service
            .send_verification_email(&user.email, &token)
            .await
        {
            tracing::warn!(
                user_id = user.id,
                "Verification email could not be sent; account stays inactive: {}",
                e
            );
            return Err(AccountError::Delivery(e));
        }

        Ok(user)
    }

    /// Activates the account holding `token`. Unknown, used and expired
    /// tokens are indistinguishable to the caller.
    pub async fn verify_email(&self, token: &str) -> Result<User, AccountError> {
        let issued_after = cutoff(VERIFICATION_TOKEN_TTL_HOURS);

        match self
            .users
            .consume_verification_token(token, issued_after)
            .await?
        {
            Some(user) => {
                tracing::info!(user_id = user.id, "Email verified, account activated");
                Ok(user)
            }
            None => Err(AccountError::InvalidToken),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        let email = normalize_email(email);

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AccountError::AccountInactive);
        }

        let tokens = self.sessions.issue_for(user.id).await?;
        tracing::debug!(user_id = user.id, "Issued session token pair");

        Ok(LoginOutcome { user, tokens })
    }

    /// Revokes `refresh_token` for the authenticated user. Every token
    /// problem collapses into `LogoutFailed`.
    pub async fn logout(&self, user_id: i64, refresh_token: &str) -> Result<(), AccountError> {
        if refresh_token.is_empty() {
            return Err(AccountError::LogoutFailed);
        }

        match self.sessions.revoke(user_id, refresh_token).await {
            Ok(()) => {
                tracing::info!(user_id, "Refresh token revoked on logout");
                Ok(())
            }
            Err(SessionError::Database(e)) => Err(SessionError::Database(e).into()),
            Err(e) => {
                tracing::debug!(user_id, "Logout rejected: {}", e);
                Err(AccountError::LogoutFailed)
            }
        }
    }

    /// Exchanges a refresh token for a new access token and its expiry.
    pub async fn refresh_access(&self, refresh_token: &str) -> Result<(String, i64), AccountError> {
        Ok(self.sessions.refresh(refresh_token).await?)
    }

    /// Issues a reset token for an active account, replacing any earlier one.
    ///
    /// Delivery failures are logged and not reported.
    pub async fn request_reset(&self, email: &str) -> Result<(), AccountError> {
        let email = normalize_email(email);
        validate_email(&email).map_err(|msg| FieldErrors::single("email", msg))?;

        let user = match self.users.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => return Err(AccountError::EmailNotFound),
        };

        let token = token_issuer::issue();
        self.users
            .set_reset_token(user.id, &token, Utc::now().timestamp())
            .await?;

        tracing::info!(user_id = user.id, "Password reset token issued");

        if let Err(e) = self
            .email_service
            .send_password_reset_email(&user.email, &token)
            .await
        {
            tracing::error!(
                user_id = user.id,
                "Password reset email could not be sent: {}",
                e
            );
        }

        Ok(())
    }

    /// Read-only validity check used before showing a new-password form.
    pub async fn check_reset_token(&self, token: &str) -> Result<ResetTokenStatus, AccountError> {
        let user = self
            .users
            .find_by_reset_token(token, cutoff(RESET_TOKEN_TTL_HOURS))
            .await?
            .ok_or(AccountError::InvalidToken)?;

        Ok(ResetTokenStatus {
            email: user.email,
            token: token.to_string(),
        })
    }

    /// Sets the new password and clears the reset token in one write.
    ///
    /// The password pair is checked before storage is consulted, and the
    /// token window is re-checked here regardless of any earlier check.
    pub async fn confirm_reset(
        &self,
        token: &str,
        new_password: &str,
        confirm_new_password: &str,
    ) -> Result<User, AccountError> {
        if new_password != confirm_new_password {
            return Err(FieldErrors::single("password", PASSWORD_MISMATCH).into());
        }
        if new_password.is_empty() {
            return Err(FieldErrors::single("new_password", BLANK).into());
        }

        let invalid_token = || FieldErrors::single("token", AccountError::InvalidToken.to_string());
        let issued_after = cutoff(RESET_TOKEN_TTL_HOURS);

        if self
            .users
            .find_by_reset_token(token, issued_after)
            .await?
            .is_none()
        {
            return Err(invalid_token().into());
        }

        let password_hash = hash_password(new_password)?;

        match self
            .users
            .consume_reset_token(token, issued_after, &password_hash)
            .await?
        {
            Some(user) => {
                tracing::info!(user_id = user.id, "Password reset completed");
                Ok(user)
            }
            None => Err(invalid_token().into()),
        }
    }
}

/// Unix timestamp before which a token of the given lifetime is expired.
fn cutoff(ttl_hours: i64) -> i64 {
    (Utc::now() - Duration::hours(ttl_hours)).timestamp()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
