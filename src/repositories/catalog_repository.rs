use crate::error::{AppError, Result};
use crate::models::catalog::{Brand, Category, Product, ProductStatus};
use async_trait::async_trait;
use sqlx::SqlitePool;

const PRODUCT_COLUMNS: &str = r#"
    id, title, slug, description, price, category_id, brand_id, status,
    inventory, views_count, is_popular, created_at, updated_at
"#;

/// Writable category fields; the slug is derived by the service.
#[derive(Debug, Clone)]
pub struct CategoryRecord {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    pub category_id: i64,
    pub brand_id: i64,
    pub status: ProductStatus,
    pub inventory: i64,
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>>;
    async fn get_category(&self, id: i64, active_only: bool) -> Result<Option<Category>>;
    async fn create_category(&self, record: &CategoryRecord) -> Result<Category>;
    async fn update_category(&self, id: i64, record: &CategoryRecord) -> Result<Option<Category>>;
    async fn delete_category(&self, id: i64) -> Result<bool>;

    async fn list_brands(&self) -> Result<Vec<Brand>>;
    async fn get_brand(&self, id: i64) -> Result<Option<Brand>>;
    async fn create_brand(&self, name: &str, slug: &str) -> Result<Brand>;
    async fn delete_brand(&self, id: i64) -> Result<bool>;

    async fn list_products(&self, available_only: bool) -> Result<Vec<Product>>;
    async fn get_product(&self, id: i64, available_only: bool) -> Result<Option<Product>>;
    async fn create_product(&self, record: &ProductRecord) -> Result<Product>;
    async fn update_product(&self, id: i64, record: &ProductRecord) -> Result<Option<Product>>;
    async fn delete_product(&self, id: i64) -> Result<bool>;

    /// Records one visit per (product, ip, day). Returns true when the visit
    /// is new, in which case the product's view counter was bumped.
    async fn record_visit(
        &self,
        product_id: i64,
        user_ip: &str,
        user_id: Option<i64>,
        visited_date: &str,
    ) -> Result<bool>;

    async fn popular_products(&self, limit: i64) -> Result<Vec<Product>>;
}

pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Translates constraint failures into client errors; anything else stays a
/// database error.
fn constraint_error(e: sqlx::Error, unique: (&str, &str), in_use: &str) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return AppError::field(unique.0, unique.1);
        }
        if db.is_foreign_key_violation() {
            return AppError::BadRequest(in_use.to_string());
        }
    }
    AppError::Database(e)
}

const CATEGORY_SLUG_TAKEN: (&str, &str) = ("title", "Category with this slug already exists.");
const BRAND_SLUG_TAKEN: (&str, &str) = ("name", "Brand with this slug already exists.");
const PRODUCT_SLUG_TAKEN: (&str, &str) = ("title", "Product with this slug already exists.");

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, title, slug, description, is_active
            FROM categories
            WHERE is_active = 1 OR ? = 0
            ORDER BY id
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn get_category(&self, id: i64, active_only: bool) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, title, slug, description, is_active
            FROM categories
            WHERE id = ? AND (is_active = 1 OR ? = 0)
            "#,
        )
        .bind(id)
        .bind(active_only)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn create_category(&self, record: &CategoryRecord) -> Result<Category> {
        let result = sqlx::query(
            "INSERT INTO categories (title, slug, description, is_active) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.description)
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, CATEGORY_SLUG_TAKEN, "Category is in use"))?;

        self.get_category(result.last_insert_rowid(), false)
            .await?
            .ok_or(AppError::InternalError)
    }

    async fn update_category(&self, id: i64, record: &CategoryRecord) -> Result<Option<Category>> {
        let result = sqlx::query(
            "UPDATE categories SET title = ?, slug = ?, description = ?, is_active = ? WHERE id = ?",
        )
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.description)
        .bind(record.is_active)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, CATEGORY_SLUG_TAKEN, "Category is in use"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_category(id, false).await
    }

    async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint_error(
                    e,
                    CATEGORY_SLUG_TAKEN,
                    "Category still has products and cannot be deleted",
                )
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_brands(&self) -> Result<Vec<Brand>> {
        let brands = sqlx::query_as::<_, Brand>("SELECT id, name, slug FROM brands ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(brands)
    }

    async fn get_brand(&self, id: i64) -> Result<Option<Brand>> {
        let brand = sqlx::query_as::<_, Brand>("SELECT id, name, slug FROM brands WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(brand)
    }

    async fn create_brand(&self, name: &str, slug: &str) -> Result<Brand> {
        let result = sqlx::query("INSERT INTO brands (name, slug) VALUES (?, ?)")
            .bind(name)
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| constraint_error(e, BRAND_SLUG_TAKEN, "Brand is in use"))?;

        self.get_brand(result.last_insert_rowid())
            .await?
            .ok_or(AppError::InternalError)
    }

    async fn delete_brand(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM brands WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint_error(
                    e,
                    BRAND_SLUG_TAKEN,
                    "Brand still has products and cannot be deleted",
                )
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self, available_only: bool) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE status = 'available' OR ? = 0 ORDER BY id",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(available_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn get_product(&self, id: i64, available_only: bool) -> Result<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = ? AND (status = 'available' OR ? = 0)",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(available_only)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn create_product(&self, record: &ProductRecord) -> Result<Product> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (title, slug, description, price, category_id, brand_id, status, inventory)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.description)
        .bind(record.price)
        .bind(record.category_id)
        .bind(record.brand_id)
        .bind(record.status)
        .bind(record.inventory)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(e, PRODUCT_SLUG_TAKEN, "Category or brand does not exist")
        })?;

        self.get_product(result.last_insert_rowid(), false)
            .await?
            .ok_or(AppError::InternalError)
    }

    async fn update_product(&self, id: i64, record: &ProductRecord) -> Result<Option<Product>> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET title = ?, slug = ?, description = ?, price = ?, category_id = ?,
                brand_id = ?, status = ?, inventory = ?, updated_at = unixepoch()
            WHERE id = ?
            "#,
        )
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.description)
        .bind(record.price)
        .bind(record.category_id)
        .bind(record.brand_id)
        .bind(record.status)
        .bind(record.inventory)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(e, PRODUCT_SLUG_TAKEN, "Category or brand does not exist")
        })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_product(id, false).await
    }

    async fn delete_product(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_visit(
        &self,
        product_id: i64,
        user_ip: &str,
        user_id: Option<i64>,
        visited_date: &str,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO visited_products (user_ip, product_id, user_id, visited_date)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_ip)
        .bind(product_id)
        .bind(user_id)
        .bind(visited_date)
        .execute(&mut *tx)
        .await?;

        let is_new = inserted.rows_affected() == 1;
        if is_new {
            sqlx::query(
                "UPDATE products SET views_count = views_count + 1, is_popular = 1 WHERE id = ?",
            )
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(is_new)
    }

    async fn popular_products(&self, limit: i64) -> Result<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {} FROM products
            WHERE status = 'available' AND is_popular = 1
            ORDER BY views_count DESC, id
            LIMIT ?
            "#,
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }
}
