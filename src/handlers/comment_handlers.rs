use crate::error::Result;
use crate::models::comment::{CommentRequest, CommentTextRequest, CommentThread, ProductComment};
use crate::models::user::AuthenticatedUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

pub async fn list_comments(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<Vec<CommentThread>>> {
    Ok(Json(state.comment_service.list_threads(product_id).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(product_id): Path<i64>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<ProductComment>)> {
    let comment = state
        .comment_service
        .create_comment(product_id, user.id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path((product_id, id)): Path<(i64, i64)>,
) -> Result<Json<ProductComment>> {
    Ok(Json(state.comment_service.get_comment(product_id, id).await?))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((product_id, id)): Path<(i64, i64)>,
    Json(request): Json<CommentTextRequest>,
) -> Result<Json<ProductComment>> {
    Ok(Json(
        state
            .comment_service
            .update_comment(product_id, id, user.id, request)
            .await?,
    ))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((product_id, id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    state
        .comment_service
        .delete_comment(product_id, id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reply_to_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((product_id, id)): Path<(i64, i64)>,
    Json(request): Json<CommentTextRequest>,
) -> Result<(StatusCode, Json<ProductComment>)> {
    let reply = state
        .comment_service
        .reply(product_id, id, user.id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(reply)))
}
