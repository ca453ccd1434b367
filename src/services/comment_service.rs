use crate::error::{AppError, Result};
use crate::models::comment::{CommentRequest, CommentTextRequest, CommentThread, ProductComment};
use crate::repositories::{CatalogRepository, CommentRepository};
use std::sync::Arc;

fn comment_not_found() -> AppError {
    AppError::NotFound("Comment not found".to_string())
}

fn required_text(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::field("text", "This field may not be blank."));
    }
    Ok(text.to_string())
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { comments, catalog }
    }

    async fn ensure_product(&self, product_id: i64) -> Result<()> {
        if self.catalog.get_product(product_id, false).await?.is_none() {
            return Err(AppError::NotFound("Product not found".to_string()));
        }
        Ok(())
    }

    async fn owned_comment(&self, product_id: i64, id: i64, user_id: i64) -> Result<ProductComment> {
        let comment = self.get_comment(product_id, id).await?;
        if comment.user_id != user_id {
            return Err(AppError::Forbidden(
                "You do not have permission to perform this action.".to_string(),
            ));
        }
        Ok(comment)
    }

    pub async fn list_threads(&self, product_id: i64) -> Result<Vec<CommentThread>> {
        self.ensure_product(product_id).await?;
        let comments = self.comments.list_for_product(product_id).await?;
        Ok(CommentThread::build(comments))
    }

    pub async fn get_comment(&self, product_id: i64, id: i64) -> Result<ProductComment> {
        self.comments
            .get(product_id, id)
            .await?
            .ok_or_else(comment_not_found)
    }

    /// A `parent` must belong to the same product.
    pub async fn create_comment(
        &self,
        product_id: i64,
        user_id: i64,
        request: CommentRequest,
    ) -> Result<ProductComment> {
        self.ensure_product(product_id).await?;
        let text = required_text(&request.text)?;

        if let Some(parent_id) = request.parent {
            if self.comments.get(product_id, parent_id).await?.is_none() {
                return Err(AppError::field(
                    "parent",
                    format!("Invalid pk \"{}\" - object does not exist.", parent_id),
                ));
            }
        }

        self.comments
            .create(product_id, user_id, request.parent, &text)
            .await
    }

    pub async fn reply(
        &self,
        product_id: i64,
        parent_id: i64,
        user_id: i64,
        request: CommentTextRequest,
    ) -> Result<ProductComment> {
        let parent = self.get_comment(product_id, parent_id).await?;
        let text = required_text(&request.text)?;

        self.comments
            .create(parent.product_id, user_id, Some(parent.id), &text)
            .await
    }

    pub async fn update_comment(
        &self,
        product_id: i64,
        id: i64,
        user_id: i64,
        request: CommentTextRequest,
    ) -> Result<ProductComment> {
        let comment = self.owned_comment(product_id, id, user_id).await?;
        let text = required_text(&request.text)?;

        self.comments
            .update_text(comment.id, &text)
            .await?
            .ok_or_else(comment_not_found)
    }

    pub async fn delete_comment(&self, product_id: i64, id: i64, user_id: i64) -> Result<()> {
        let comment = self.owned_comment(product_id, id, user_id).await?;
        if !self.comments.delete(comment.id).await? {
            return Err(comment_not_found());
        }
        Ok(())
    }
}
