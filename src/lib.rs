pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use repositories::{
    SqliteCartRepository, SqliteCatalogRepository, SqliteCommentRepository, SqliteUserRepository,
};
use services::{
    AccountService, CartService, CatalogService, CommentService, EmailService, SessionIssuer,
    SqliteSessionIssuer, UserService,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub account_service: Arc<AccountService>,
    pub user_service: Arc<UserService>,
    pub sessions: Arc<dyn SessionIssuer>,
    pub catalog_service: Arc<CatalogService>,
    pub cart_service: Arc<CartService>,
    pub comment_service: Arc<CommentService>,
    pub pool: sqlx::SqlitePool,
}

impl AppState {
    /// Wires repositories and services over one pool. The email sender is
    /// injected so tests can observe or fail deliveries.
    pub fn new(
        pool: sqlx::SqlitePool,
        settings: config::Settings,
        email_service: Arc<dyn EmailService>,
    ) -> Self {
        let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
        let catalog_repository = Arc::new(SqliteCatalogRepository::new(pool.clone()));
        let cart_repository = Arc::new(SqliteCartRepository::new(pool.clone()));
        let comment_repository = Arc::new(SqliteCommentRepository::new(pool.clone()));

        let sessions: Arc<dyn SessionIssuer> = Arc::new(SqliteSessionIssuer::new(
            pool.clone(),
            settings.access_token_ttl_secs,
            settings.refresh_token_ttl_secs,
        ));

        let account_service = Arc::new(AccountService::new(
            user_repository.clone(),
            sessions.clone(),
            email_service,
        ));
        let user_service = Arc::new(UserService::new(user_repository));
        let catalog_service = Arc::new(CatalogService::new(catalog_repository.clone()));
        let cart_service = Arc::new(CartService::new(
            cart_repository,
            catalog_repository.clone(),
        ));
        let comment_service = Arc::new(CommentService::new(
            comment_repository,
            catalog_repository,
        ));

        Self {
            settings: Arc::new(settings),
            account_service,
            user_service,
            sessions,
            catalog_service,
            cart_service,
            comment_service,
            pool,
        }
    }
}
