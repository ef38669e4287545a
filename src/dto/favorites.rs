use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddFavoriteRequest {
    pub product_id: Uuid,
}

/// A favorited product with the moment it was saved.
#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub product: Product,
    pub favorited_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FavoriteProductList {
    pub items: Vec<FavoriteEntry>,
}
