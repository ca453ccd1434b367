use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub is_paid: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A cart line joined with the product it points at.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItemDetail {
    pub id: i64,
    #[serde(rename = "product")]
    pub product_id: i64,
    pub product_title: String,
    pub product_price: i64,
    pub quantity: i64,
}

impl CartItemDetail {
    /// Saturates at `i64::MAX` for rows written outside the catalog limits.
    pub fn total_price(&self) -> i64 {
        self.product_price.saturating_mul(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    #[serde(flatten)]
    pub item: CartItemDetail,
    pub total_item_price: i64,
}

impl From<CartItemDetail> for CartItemView {
    fn from(item: CartItemDetail) -> Self {
        let total_item_price = item.total_price();
        Self {
            item,
            total_item_price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartDetail {
    pub id: i64,
    pub items: Vec<CartItemView>,
    pub total_price: i64,
    pub total_items: i64,
    pub is_paid: bool,
}

impl CartDetail {
    pub fn new(cart: &Cart, items: Vec<CartItemDetail>) -> Self {
        let total_price = items
            .iter()
            .map(CartItemDetail::total_price)
            .fold(0i64, i64::saturating_add);
        let total_items = items
            .iter()
            .map(|item| item.quantity)
            .fold(0i64, i64::saturating_add);
        Self {
            id: cart.id,
            items: items.into_iter().map(CartItemView::from).collect(),
            total_price,
            total_items,
            is_paid: cart.is_paid,
        }
    }
}

// Required numbers are `Option`; the cart service turns a missing one into a
// field error.

#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<i64>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveItemRequest {
    pub cart_item_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemQuantityRequest {
    pub cart_item_id: Option<i64>,
    pub quantity: Option<i64>,
}

fn default_quantity() -> i64 {
    1
}
