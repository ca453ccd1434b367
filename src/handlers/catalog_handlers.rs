use crate::auth::middleware::optional_user;
use crate::error::Result;
use crate::models::catalog::{
    Brand, BrandRequest, Category, CategoryRequest, Product, ProductRequest, ProductView,
};
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Path, Request, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::net::SocketAddr;

/// First address in `X-Forwarded-For`, else the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog_service.list_categories().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>> {
    Ok(Json(state.catalog_service.get_category(id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state.catalog_service.create_category(request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    Ok(Json(state.catalog_service.update_category(id, request).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.catalog_service.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_brands(State(state): State<AppState>) -> Result<Json<Vec<Brand>>> {
    Ok(Json(state.catalog_service.list_brands().await?))
}

pub async fn create_brand(
    State(state): State<AppState>,
    Json(request): Json<BrandRequest>,
) -> Result<(StatusCode, Json<Brand>)> {
    let brand = state.catalog_service.create_brand(request).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

pub async fn delete_brand(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    state.catalog_service.delete_brand(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog_service.list_products().await?))
}

pub async fn popular_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog_service.popular_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog_service.get_product(id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog_service.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog_service.update_product(id, request).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.catalog_service.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn view_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<ProductView>> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);
    let user = optional_user(&state, request.headers()).await?;

    let view = state
        .catalog_service
        .view_product(id, &ip, user.map(|u| u.id))
        .await?;
    Ok(Json(view))
}
