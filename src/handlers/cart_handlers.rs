use crate::error::Result;
use crate::models::cart::{
    AddItemRequest, CartDetail, CartItemView, RemoveItemRequest, UpdateItemQuantityRequest,
};
use crate::models::user::AuthenticatedUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::json;

pub async fn list_carts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<CartDetail>>> {
    Ok(Json(state.cart_service.list_carts(user.id).await?))
}

pub async fn create_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<(StatusCode, Json<CartDetail>)> {
    let cart = state.cart_service.create_cart(user.id).await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<CartDetail>> {
    Ok(Json(state.cart_service.get_cart(id, user.id).await?))
}

pub async fn delete_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.cart_service.delete_cart(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartItemView>> {
    Ok(Json(state.cart_service.add_item(id, user.id, request).await?))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(request): Json<RemoveItemRequest>,
) -> Result<Json<serde_json::Value>> {
    state.cart_service.remove_item(id, user.id, request).await?;
    Ok(Json(json!({ "status": "Item removed from cart" })))
}

pub async fn update_item_quantity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateItemQuantityRequest>,
) -> Result<Json<CartItemView>> {
    Ok(Json(
        state
            .cart_service
            .update_item_quantity(id, user.id, request)
            .await?,
    ))
}
