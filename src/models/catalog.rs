use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Available,
    Unavailable,
    Limited,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    #[serde(rename = "category")]
    pub category_id: i64,
    #[serde(rename = "brand")]
    pub brand_id: i64,
    pub status: ProductStatus,
    pub inventory: i64,
    pub views_count: i64,
    pub is_popular: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Available
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<i64>,
    pub category: Option<i64>,
    pub brand: Option<i64>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default = "default_inventory")]
    pub inventory: i64,
}

/// Result of recording a product page visit.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub product: Product,
    pub is_new_view: bool,
}

fn default_true() -> bool {
    true
}

fn default_inventory() -> i64 {
    1
}
