pub mod cart_handlers;
pub mod catalog_handlers;
pub mod comment_handlers;
