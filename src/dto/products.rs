use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Product;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ContentEntry {
    #[validate(length(min = 1, max = 16))]
    pub emoji: String,
    #[validate(length(min = 1, max = 120))]
    pub label: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub original_price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub product_type: Option<String>,
    pub region: Option<String>,
    pub pickup_info: Option<String>,
    #[serde(default)]
    pub solidaire: bool,
    #[validate(nested)]
    #[serde(default)]
    pub contents: Vec<ContentEntry>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub original_price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub product_type: Option<String>,
    pub region: Option<String>,
    pub pickup_info: Option<String>,
    pub solidaire: Option<bool>,
    pub is_active: Option<bool>,
    /// Replaces the whole contents list when present.
    #[validate(nested)]
    pub contents: Option<Vec<ContentEntry>>,
}

/// Moderation update: everything a seller can change plus the shop flags.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct AdminUpdateProductRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub product: UpdateProductRequest,
    pub featured: Option<bool>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegionList {
    pub items: Vec<String>,
}
