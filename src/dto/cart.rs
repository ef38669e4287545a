use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Product;

/// Upper bound on a single cart line.
pub const MAX_CART_QUANTITY: i32 = 10_000;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(
        min = 1,
        max = MAX_CART_QUANTITY,
        message = "quantity must be between 1 and 10000"
    ))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(
        min = 1,
        max = MAX_CART_QUANTITY,
        message = "quantity must be between 1 and 10000"
    ))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemDto>,
    pub item_count: i64,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
    pub line_total: i64,
}
