use crate::error::{AppError, Result};
use crate::models::cart::{Cart, CartItemDetail};
use async_trait::async_trait;
use sqlx::SqlitePool;

const ITEM_SELECT: &str = r#"
    SELECT ci.id, ci.product_id, p.title AS product_title, p.price AS product_price, ci.quantity
    FROM cart_items ci
    JOIN products p ON p.id = ci.product_id
"#;

/// Carts are always addressed together with their owner; a cart that belongs
/// to someone else or is already paid behaves as missing.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn list_unpaid(&self, user_id: i64) -> Result<Vec<Cart>>;
    async fn create(&self, user_id: i64) -> Result<Cart>;
    async fn get(&self, id: i64, user_id: i64) -> Result<Option<Cart>>;
    async fn delete(&self, id: i64, user_id: i64) -> Result<bool>;

    async fn items(&self, cart_id: i64) -> Result<Vec<CartItemDetail>>;
    async fn find_item(&self, cart_id: i64, item_id: i64) -> Result<Option<CartItemDetail>>;
    async fn find_item_for_product(
        &self,
        cart_id: i64,
        product_id: i64,
    ) -> Result<Option<CartItemDetail>>;

    /// Adds `quantity` to the line for `product_id`, creating it if needed.
    async fn add_quantity(&self, cart_id: i64, product_id: i64, quantity: i64)
        -> Result<CartItemDetail>;
    async fn set_quantity(&self, cart_id: i64, item_id: i64, quantity: i64)
        -> Result<Option<CartItemDetail>>;
    async fn remove_item(&self, cart_id: i64, item_id: i64) -> Result<bool>;
}

pub struct SqliteCartRepository {
    pool: SqlitePool,
}

impl SqliteCartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn touch(&self, cart_id: i64) -> Result<()> {
        sqlx::query("UPDATE carts SET updated_at = unixepoch() WHERE id = ?")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for SqliteCartRepository {
    async fn list_unpaid(&self, user_id: i64) -> Result<Vec<Cart>> {
        let carts = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, user_id, is_paid, created_at, updated_at
            FROM carts
            WHERE user_id = ? AND is_paid = 0
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(carts)
    }

    async fn create(&self, user_id: i64) -> Result<Cart> {
        let result = sqlx::query("INSERT INTO carts (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.get(result.last_insert_rowid(), user_id)
            .await?
            .ok_or(AppError::InternalError)
    }

    async fn get(&self, id: i64, user_id: i64) -> Result<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, user_id, is_paid, created_at, updated_at
            FROM carts
            WHERE id = ? AND user_id = ? AND is_paid = 0
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE id = ? AND user_id = ? AND is_paid = 0")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn items(&self, cart_id: i64) -> Result<Vec<CartItemDetail>> {
        let sql = format!("{} WHERE ci.cart_id = ? ORDER BY ci.id", ITEM_SELECT);
        let items = sqlx::query_as::<_, CartItemDetail>(&sql)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn find_item(&self, cart_id: i64, item_id: i64) -> Result<Option<CartItemDetail>> {
        let sql = format!("{} WHERE ci.cart_id = ? AND ci.id = ?", ITEM_SELECT);
        let item = sqlx::query_as::<_, CartItemDetail>(&sql)
            .bind(cart_id)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn find_item_for_product(
        &self,
        cart_id: i64,
        product_id: i64,
    ) -> Result<Option<CartItemDetail>> {
        let sql = format!("{} WHERE ci.cart_id = ? AND ci.product_id = ?", ITEM_SELECT);
        let item = sqlx::query_as::<_, CartItemDetail>(&sql)
            .bind(cart_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn add_quantity(
        &self,
        cart_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<CartItemDetail> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES (?, ?, ?)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + excluded.quantity
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        self.touch(cart_id).await?;

        self.find_item_for_product(cart_id, product_id)
            .await?
            .ok_or(AppError::InternalError)
    }

    async fn set_quantity(
        &self,
        cart_id: i64,
        item_id: i64,
        quantity: i64,
    ) -> Result<Option<CartItemDetail>> {
        let result = sqlx::query("UPDATE cart_items SET quantity = ? WHERE id = ? AND cart_id = ?")
            .bind(quantity)
            .bind(item_id)
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.touch(cart_id).await?;
        self.find_item(cart_id, item_id).await
    }

    async fn remove_item(&self, cart_id: i64, item_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = ? AND cart_id = ?")
            .bind(item_id)
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            self.touch(cart_id).await?;
        }
        Ok(result.rows_affected() > 0)
    }
}
