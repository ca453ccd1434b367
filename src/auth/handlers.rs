use crate::error::Result;
use crate::models::user::AuthenticatedUser;
use crate::services::account_service::RegisterRequest;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

// Missing fields deserialize as empty strings so they surface as per-field
// "may not be blank" errors instead of a body rejection.

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshBody {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetBody {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmBody {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_new_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<Response> {
    let request = RegisterRequest {
        username: body.username,
        email: body.email,
        password: body.password,
        confirm_password: body.confirm_password,
        first_name: body.first_name,
        last_name: body.last_name,
    };

    let user = state.account_service.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully. Please verify your email.",
            "user_id": user.id,
        })),
    )
        .into_response())
}

pub async fn verify_email_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.account_service.verify_email(&token).await?;
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>> {
    let outcome = state
        .account_service
        .login(&body.email, &body.password)
        .await?;

    Ok(Json(LoginResponse {
        user_id: outcome.user.id,
        username: outcome.user.username,
        email: outcome.user.email,
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
    }))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<RefreshBody>,
) -> Result<Json<serde_json::Value>> {
    state
        .account_service
        .logout(user.id, &body.refresh_token)
        .await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshBody>,
) -> Result<Json<serde_json::Value>> {
    let (access_token, expires_at) = state
        .account_service
        .refresh_access(&body.refresh_token)
        .await?;

    Ok(Json(json!({
        "access_token": access_token,
        "expires_in": (expires_at - Utc::now().timestamp()).max(0),
    })))
}

pub async fn password_reset_handler(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetBody>,
) -> Result<Json<serde_json::Value>> {
    state.account_service.request_reset(&body.email).await?;
    Ok(Json(json!({ "message": "Password reset link sent" })))
}

pub async fn password_reset_check_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let status = state.account_service.check_reset_token(&token).await?;
    Ok(Json(json!({
        "message": "Token is valid",
        "email": status.email,
        "token": status.token,
    })))
}

pub async fn password_reset_confirm_handler(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetConfirmBody>,
) -> Result<Json<serde_json::Value>> {
    state
        .account_service
        .confirm_reset(&body.token, &body.new_password, &body.confirm_new_password)
        .await?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}
