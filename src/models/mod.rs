pub mod cart;
pub mod catalog;
pub mod comment;
pub mod session;
pub mod user;

pub use cart::{Cart, CartDetail, CartItemDetail, CartItemView};
pub use catalog::{Brand, Category, Product, ProductStatus, ProductView};
pub use comment::{CommentThread, ProductComment};
pub use session::{AccessToken, RefreshToken, TokenPair};
pub use user::{AuthenticatedUser, NewUser, User};
