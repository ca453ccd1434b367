use crate::models::user::{NewUser, User};
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::password::{hash_password, HashingError};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

pub const USERNAME_MAX_LEN: usize = 50;
pub const NAME_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 254;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Trims the address and lower-cases its domain part.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("This field may not be blank.");
    }
    if email.len() > EMAIL_MAX_LEN || !EMAIL_RE.is_match(email) {
        return Err("Enter a valid email address.");
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("This field may not be blank.");
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err("Ensure this field has no more than 50 characters.");
    }
    if !USERNAME_RE.is_match(username) {
        return Err("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.");
    }
    Ok(())
}

pub fn validate_name(name: Option<&str>) -> Result<(), &'static str> {
    match name {
        Some(name) if name.chars().count() > NAME_MAX_LEN => {
            Err("Ensure this field has no more than 50 characters.")
        }
        _ => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(&'static str),
    #[error("Invalid username: {0}")]
    InvalidUsername(&'static str),
    #[error("Password may not be blank")]
    BlankPassword,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("User not found")]
    UserNotFound,
    #[error("Email or username already registered")]
    AlreadyRegistered,
    #[error(transparent)]
    HashingError(#[from] HashingError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl CreateUserRequest {
    /// A superuser is staff and active from the start.
    pub fn superuser(username: String, email: String, password: String) -> Self {
        Self {
            username,
            email,
            password,
            password_confirm: None,
            is_active: true,
            is_staff: true,
            is_superuser: true,
        }
    }
}

pub struct UpdatePasswordRequest {
    pub user_id: i64,
    pub new_password: String,
    pub new_password_confirm: Option<String>,
}

/// Administrative user management, bypassing the email workflow.
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserServiceError> {
        let email = normalize_email(&request.email);
        let username = request.username.trim().to_string();

        validate_email(&email).map_err(UserServiceError::InvalidEmail)?;
        validate_username(&username).map_err(UserServiceError::InvalidUsername)?;

        if let Some(ref confirm) = request.password_confirm {
            if request.password != *confirm {
                return Err(UserServiceError::PasswordMismatch);
            }
        }

        if request.password.is_empty() {
            return Err(UserServiceError::BlankPassword);
        }

        let password_hash = hash_password(&request.password)?;

        let new_user = NewUser {
            username,
            email,
            password_hash,
            first_name: None,
            last_name: None,
            is_active: request.is_active,
            is_staff: request.is_staff,
            is_superuser: request.is_superuser,
            email_verification_token: None,
        };

        match self
            .repository
            .create_user(&new_user, Utc::now().timestamp())
            .await
        {
            Ok(user) => Ok(user),
            Err(RepositoryError::AlreadyExists) => Err(UserServiceError::AlreadyRegistered),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_email(&normalize_email(email)).await?)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_users(limit, offset).await?)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        match self.repository.delete_user(id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<(), UserServiceError> {
        match self.repository.set_active(id, active).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn update_password(
        &self,
        request: UpdatePasswordRequest,
    ) -> Result<(), UserServiceError> {
        if let Some(ref confirm) = request.new_password_confirm {
            if request.new_password != *confirm {
                return Err(UserServiceError::PasswordMismatch);
            }
        }

        if request.new_password.is_empty() {
            return Err(UserServiceError::BlankPassword);
        }

        let password_hash = hash_password(&request.new_password)?;

        match self
            .repository
            .update_password(request.user_id, &password_hash)
            .await
        {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }
}
