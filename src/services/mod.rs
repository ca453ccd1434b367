pub mod account_service;
pub mod cart_service;
pub mod catalog_service;
pub mod comment_service;
pub mod email_service;
pub mod password;
pub mod session_service;
pub mod token_issuer;
pub mod user_service;

pub use account_service::{AccountError, AccountService};
pub use cart_service::CartService;
pub use catalog_service::CatalogService;
pub use comment_service::CommentService;
pub use email_service::{create_email_service, EmailError, EmailService};
pub use session_service::{SessionError, SessionIssuer, SqliteSessionIssuer};
pub use user_service::{UserService, UserServiceError};
