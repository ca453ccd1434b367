use crate::error::{AppError, Result};
use crate::models::cart::{
    AddItemRequest, Cart, CartDetail, CartItemView, RemoveItemRequest, UpdateItemQuantityRequest,
};
use crate::repositories::{CartRepository, CatalogRepository};
use crate::services::catalog_service::MAX_INVENTORY;
use std::sync::Arc;

const INSUFFICIENT_INVENTORY: &str = "Insufficient inventory";

fn cart_not_found() -> AppError {
    AppError::NotFound("Cart not found".to_string())
}

fn item_not_found() -> AppError {
    AppError::NotFound("Item not found in cart".to_string())
}

fn check_quantity(quantity: i64) -> Result<()> {
    if quantity < 1 {
        return Err(AppError::field("quantity", "Quantity must be at least 1"));
    }
    if quantity > MAX_INVENTORY {
        return Err(too_many());
    }
    Ok(())
}

fn required(field: &str, value: Option<i64>) -> Result<i64> {
    value.ok_or_else(|| AppError::field(field, "This field is required."))
}

fn too_many() -> AppError {
    AppError::field(
        "quantity",
        format!("Ensure this value is less than or equal to {}.", MAX_INVENTORY),
    )
}

/// Shopping carts scoped to their owner. Only unpaid carts are visible.
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { carts, catalog }
    }

    async fn owned_cart(&self, id: i64, user_id: i64) -> Result<Cart> {
        self.carts.get(id, user_id).await?.ok_or_else(cart_not_found)
    }

    pub async fn list_carts(&self, user_id: i64) -> Result<Vec<CartDetail>> {
        let carts = self.carts.list_unpaid(user_id).await?;
        let mut details = Vec::with_capacity(carts.len());
        for cart in carts {
            let items = self.carts.items(cart.id).await?;
            details.push(CartDetail::new(&cart, items));
        }
        Ok(details)
    }

    pub async fn create_cart(&self, user_id: i64) -> Result<CartDetail> {
        let cart = self.carts.create(user_id).await?;
        tracing::debug!(user_id, cart_id = cart.id, "Created cart");
        Ok(CartDetail::new(&cart, Vec::new()))
    }

    pub async fn get_cart(&self, id: i64, user_id: i64) -> Result<CartDetail> {
        let cart = self.owned_cart(id, user_id).await?;
        let items = self.carts.items(cart.id).await?;
        Ok(CartDetail::new(&cart, items))
    }

    pub async fn delete_cart(&self, id: i64, user_id: i64) -> Result<()> {
        if !self.carts.delete(id, user_id).await? {
            return Err(cart_not_found());
        }
        Ok(())
    }

    /// Adds an available product, merging with an existing line. The merged
    /// quantity may not exceed the product's inventory.
    pub async fn add_item(
        &self,
        cart_id: i64,
        user_id: i64,
        request: AddItemRequest,
    ) -> Result<CartItemView> {
        let cart = self.owned_cart(cart_id, user_id).await?;
        let product_id = required("product_id", request.product_id)?;
        check_quantity(request.quantity)?;

        let product = self
            .catalog
            .get_product(product_id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        let existing = self
            .carts
            .find_item_for_product(cart.id, product.id)
            .await?
            .map(|item| item.quantity)
            .unwrap_or(0);

        let merged = existing
            .checked_add(request.quantity)
            .filter(|total| *total <= MAX_INVENTORY)
            .ok_or_else(too_many)?;
        if merged > product.inventory {
            return Err(AppError::BadRequest(INSUFFICIENT_INVENTORY.to_string()));
        }

        let item = self
            .carts
            .add_quantity(cart.id, product.id, request.quantity)
            .await?;
        Ok(item.into())
    }

    pub async fn remove_item(
        &self,
        cart_id: i64,
        user_id: i64,
        request: RemoveItemRequest,
    ) -> Result<()> {
        let cart = self.owned_cart(cart_id, user_id).await?;
        let item_id = required("cart_item_id", request.cart_item_id)?;
        if !self.carts.remove_item(cart.id, item_id).await? {
            return Err(item_not_found());
        }
        Ok(())
    }

    pub async fn update_item_quantity(
        &self,
        cart_id: i64,
        user_id: i64,
        request: UpdateItemQuantityRequest,
    ) -> Result<CartItemView> {
        let cart = self.owned_cart(cart_id, user_id).await?;
        let item_id = required("cart_item_id", request.cart_item_id)?;
        let quantity = required("quantity", request.quantity)?;
        check_quantity(quantity)?;

        let item = self
            .carts
            .find_item(cart.id, item_id)
            .await?
            .ok_or_else(item_not_found)?;

        let product = self
            .catalog
            .get_product(item.product_id, false)
            .await?
            .ok_or_else(item_not_found)?;

        if quantity > product.inventory {
            return Err(AppError::BadRequest(INSUFFICIENT_INVENTORY.to_string()));
        }

        let item = self
            .carts
            .set_quantity(cart.id, item.id, quantity)
            .await?
            .ok_or_else(item_not_found)?;
        Ok(item.into())
    }
}
