use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub client_secret: String,
    /// Set only when a real payment intent was created.
    pub payment_intent_id: Option<String>,
    pub total: i64,
    pub orders: Vec<SellerOrderSummary>,
    pub low_stock_warnings: Vec<LowStockWarning>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SellerOrderSummary {
    pub order_id: Uuid,
    pub seller_id: Uuid,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct LowStockWarning {
    pub product_id: Uuid,
    pub product_name: String,
    pub remaining: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BuyerContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerOrder {
    pub order: Order,
    /// Only the calling seller's items.
    pub items: Vec<OrderItem>,
    pub buyer: Option<BuyerContact>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerOrderList {
    pub items: Vec<SellerOrder>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PickupResult {
    pub picked_up: u64,
    pub order: OrderWithItems,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}
