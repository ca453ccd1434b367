use crate::error::{AppError, FieldErrors, Result};
use crate::models::catalog::{
    Brand, BrandRequest, Category, CategoryRequest, Product, ProductRequest, ProductView,
};
use crate::repositories::catalog_repository::{CategoryRecord, ProductRecord};
use crate::repositories::CatalogRepository;
use chrono::Utc;
use std::sync::Arc;

pub const POPULAR_LIMIT: i64 = 10;
pub const TITLE_MAX_LEN: usize = 200;
/// Upper bounds keep cart totals (price * quantity, summed) inside `i64`.
pub const MAX_PRICE: i64 = 1_000_000_000;
pub const MAX_INVENTORY: i64 = 1_000_000;

const REQUIRED: &str = "This field is required.";

fn missing_pk(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

/// URL slug: lower-cased letters and digits with runs of whitespace,
/// hyphens and underscores collapsed to a single hyphen. Other characters
/// are dropped. Non-ASCII letters are kept.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for ch in value.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }

    slug
}

fn required_title(field: &str, title: &str, errors: &mut FieldErrors) -> String {
    let title = title.trim();
    if title.is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if title.chars().count() > TITLE_MAX_LEN {
        errors.add(field, "Ensure this field has no more than 200 characters.");
    } else if slugify(title).is_empty() {
        errors.add(field, "Must contain at least one letter or digit.");
    }
    title.to_string()
}

pub struct CatalogService {
    repository: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn CatalogRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.repository.list_categories(true).await
    }

    pub async fn get_category(&self, id: i64) -> Result<Category> {
        self.repository
            .get_category(id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    fn category_record(request: CategoryRequest) -> Result<CategoryRecord> {
        let mut errors = FieldErrors::new();
        let title = required_title("title", &request.title, &mut errors);
        errors.into_result()?;

        Ok(CategoryRecord {
            slug: slugify(&title),
            title,
            description: request.description,
            is_active: request.is_active,
        })
    }

    pub async fn create_category(&self, request: CategoryRequest) -> Result<Category> {
        let record = Self::category_record(request)?;
        let category = self.repository.create_category(&record).await?;
        tracing::info!(category_id = category.id, "Created category {}", category.slug);
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, request: CategoryRequest) -> Result<Category> {
        let record = Self::category_record(request)?;
        self.repository
            .update_category(id, &record)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        if !self.repository.delete_category(id).await? {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        tracing::info!(category_id = id, "Deleted category");
        Ok(())
    }

    pub async fn list_brands(&self) -> Result<Vec<Brand>> {
        self.repository.list_brands().await
    }

    pub async fn create_brand(&self, request: BrandRequest) -> Result<Brand> {
        let mut errors = FieldErrors::new();
        let name = required_title("name", &request.name, &mut errors);
        errors.into_result()?;

        self.repository.create_brand(&name, &slugify(&name)).await
    }

    pub async fn delete_brand(&self, id: i64) -> Result<()> {
        if !self.repository.delete_brand(id).await? {
            return Err(AppError::NotFound("Brand not found".to_string()));
        }
        Ok(())
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.repository.list_products(true).await
    }

    pub async fn get_product(&self, id: i64) -> Result<Product> {
        self.repository
            .get_product(id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
    }

    async fn product_record(&self, request: ProductRequest) -> Result<ProductRecord> {
        let mut errors = FieldErrors::new();
        let title = required_title("title", &request.title, &mut errors);

        match request.price {
            None => errors.add("price", REQUIRED),
            Some(price) if price <= 0 => errors.add("price", "Price must be positive"),
            Some(price) if price > MAX_PRICE => errors.add(
                "price",
                format!("Ensure this value is less than or equal to {}.", MAX_PRICE),
            ),
            Some(_) => {}
        }
        if request.inventory < 0 {
            errors.add("inventory", "Inventory cannot be negative");
        } else if request.inventory > MAX_INVENTORY {
            errors.add(
                "inventory",
                format!("Ensure this value is less than or equal to {}.", MAX_INVENTORY),
            );
        }
        match request.category {
            None => errors.add("category", REQUIRED),
            Some(id) => {
                if self.repository.get_category(id, false).await?.is_none() {
                    errors.add("category", missing_pk(id));
                }
            }
        }
        match request.brand {
            None => errors.add("brand", REQUIRED),
            Some(id) => {
                if self.repository.get_brand(id).await?.is_none() {
                    errors.add("brand", missing_pk(id));
                }
            }
        }
        errors.into_result()?;

        // Presence checked above
        Ok(ProductRecord {
            slug: slugify(&title),
            title,
            description: request.description,
            price: request.price.unwrap_or_default(),
            category_id: request.category.unwrap_or_default(),
            brand_id: request.brand.unwrap_or_default(),
            status: request.status,
            inventory: request.inventory,
        })
    }

    pub async fn create_product(&self, request: ProductRequest) -> Result<Product> {
        let record = self.product_record(request).await?;
        let product = self.repository.create_product(&record).await?;
        tracing::info!(product_id = product.id, "Created product {}", product.slug);
        Ok(product)
    }

    /// Staff edits reach products in any status.
    pub async fn update_product(&self, id: i64, request: ProductRequest) -> Result<Product> {
        let record = self.product_record(request).await?;
        self.repository
            .update_product(id, &record)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
    }

    pub async fn delete_product(&self, id: i64) -> Result<()> {
        if !self.repository.delete_product(id).await? {
            return Err(AppError::NotFound("Product not found".to_string()));
        }
        tracing::info!(product_id = id, "Deleted product");
        Ok(())
    }

    /// Counts at most one view per product, client address and UTC day.
    pub async fn view_product(
        &self,
        id: i64,
        user_ip: &str,
        user_id: Option<i64>,
    ) -> Result<ProductView> {
        let product = self.get_product(id).await?;
        let today = Utc::now().date_naive().to_string();

        let is_new_view = self
            .repository
            .record_visit(product.id, user_ip, user_id, &today)
            .await?;

        let product = if is_new_view {
            tracing::debug!(product_id = id, "New product view recorded");
            self.get_product(id).await?
        } else {
            product
        };

        Ok(ProductView {
            product,
            is_new_view,
        })
    }

    pub async fn popular_products(&self) -> Result<Vec<Product>> {
        self.repository.popular_products(POPULAR_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Gaming Laptops  "), "gaming-laptops");
        assert_eq!(slugify("Phones & Tablets"), "phones-tablets");
        assert_eq!(slugify("a--b__c"), "a-b-c");
        assert_eq!(slugify("-leading"), "leading");
    }

    #[test]
    fn test_slugify_keeps_unicode_letters() {
        assert_eq!(slugify("گوشی موبایل"), "گوشی-موبایل");
        assert_eq!(slugify("Ünïcode Café"), "ünïcode-café");
    }

    #[test]
    fn test_slugify_of_symbols_is_empty() {
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn test_required_title_rejects_blank_and_symbol_only() {
        let mut errors = FieldErrors::new();
        required_title("title", "   ", &mut errors);
        assert!(errors.contains("title"));

        let mut errors = FieldErrors::new();
        required_title("name", "%%%", &mut errors);
        assert!(errors.contains("name"));

        let mut errors = FieldErrors::new();
        assert_eq!(required_title("title", " Shoes ", &mut errors), "Shoes");
        assert!(errors.is_empty());
    }
}
