use crate::{error::AppError, models::user::AuthenticatedUser, AppState};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

const NOT_PROVIDED: &str = "Authentication credentials were not provided.";
const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(state: &AppState, token: &str) -> Result<AuthenticatedUser, AppError> {
    let user_id = state.sessions.authenticate(token).await?;

    let user = state
        .user_service
        .find_user_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!("User lookup during authentication failed: {}", e);
            AppError::InternalError
        })?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if !user.is_active {
        return Err(AppError::Unauthorized("User is inactive".to_string()));
    }

    Ok(user.into())
}

/// Resolves the caller when a bearer token is present. A present but
/// invalid token is still an error.
pub async fn optional_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthenticatedUser>, AppError> {
    match extract_bearer_token(headers) {
        Some(token) => authenticate(state, token).await.map(Some),
        None => Ok(None),
    }
}

/// Requires a valid access token and attaches the `AuthenticatedUser` to
/// the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized(NOT_PROVIDED.to_string()))?
        .to_string();

    let user = authenticate(&state, &token).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Like `require_auth`, additionally rejecting non-staff callers with 403.
pub async fn require_staff(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized(NOT_PROVIDED.to_string()))?
        .to_string();

    let user = authenticate(&state, &token).await?;
    if !user.is_staff {
        tracing::debug!(user_id = user.id, "Staff-only request rejected");
        return Err(AppError::Forbidden(PERMISSION_DENIED.to_string()));
    }
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
