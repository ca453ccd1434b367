use crate::error::{AppError, Result};
use crate::models::comment::ProductComment;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// All comments of a product, oldest first.
    async fn list_for_product(&self, product_id: i64) -> Result<Vec<ProductComment>>;
    async fn get(&self, product_id: i64, id: i64) -> Result<Option<ProductComment>>;
    async fn create(
        &self,
        product_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        text: &str,
    ) -> Result<ProductComment>;
    async fn update_text(&self, id: i64, text: &str) -> Result<Option<ProductComment>>;
    /// Deleting a comment removes its replies as well.
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqliteCommentRepository {
    pool: SqlitePool,
}

impl SqliteCommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ProductComment>> {
        let comment = sqlx::query_as::<_, ProductComment>(
            r#"
            SELECT id, product_id, parent_id, user_id, text, created_at
            FROM product_comments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn list_for_product(&self, product_id: i64) -> Result<Vec<ProductComment>> {
        let comments = sqlx::query_as::<_, ProductComment>(
            r#"
            SELECT id, product_id, parent_id, user_id, text, created_at
            FROM product_comments
            WHERE product_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn get(&self, product_id: i64, id: i64) -> Result<Option<ProductComment>> {
        let comment = sqlx::query_as::<_, ProductComment>(
            r#"
            SELECT id, product_id, parent_id, user_id, text, created_at
            FROM product_comments
            WHERE id = ? AND product_id = ?
            "#,
        )
        .bind(id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn create(
        &self,
        product_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        text: &str,
    ) -> Result<ProductComment> {
        let result = sqlx::query(
            "INSERT INTO product_comments (product_id, parent_id, user_id, text) VALUES (?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(parent_id)
        .bind(user_id)
        .bind(text)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or(AppError::InternalError)
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<Option<ProductComment>> {
        let result = sqlx::query("UPDATE product_comments SET text = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM product_comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
