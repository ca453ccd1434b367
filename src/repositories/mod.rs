pub mod cart_repository;
pub mod catalog_repository;
pub mod comment_repository;
pub mod user_repository;

pub use cart_repository::{CartRepository, SqliteCartRepository};
pub use catalog_repository::{CatalogRepository, SqliteCatalogRepository};
pub use comment_repository::{CommentRepository, SqliteCommentRepository};
pub use user_repository::{RepositoryError, SqliteUserRepository, UserRepository};
