use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    categories, favorites, notifications, order_items, orders, product_contents, products, users,
    enums::{AccountStatus, NotificationKind, OrderStatus, UserRole},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub region: Option<String>,
    pub company_name: Option<String>,
    pub role: UserRole,
    pub account_status: AccountStatus,
    pub siret: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub student_proof: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            phone: model.phone,
            address: model.address,
            city: model.city,
            postal_code: model.postal_code,
            region: model.region,
            company_name: model.company_name,
            role: model.role,
            account_status: model.account_status,
            siret: model.siret,
            iban: model.iban,
            bic: model.bic,
            student_proof: model.student_proof,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ProductContent {
    pub position: i32,
    pub emoji: String,
    pub label: String,
}

impl From<product_contents::Model> for ProductContent {
    fn from(model: product_contents::Model) -> Self {
        Self {
            position: model.position,
            emoji: model.emoji,
            label: model.label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Seller display name, filled on detail and listing endpoints.
    pub producer: Option<String>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub original_price: Option<i64>,
    pub stock: i32,
    pub rating: f64,
    pub image_url: Option<String>,
    pub product_type: Option<String>,
    pub region: Option<String>,
    pub pickup_info: Option<String>,
    pub solidaire: bool,
    pub is_restaurant: bool,
    pub is_active: bool,
    pub featured: bool,
    pub contents: Vec<ProductContent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            producer: None,
            category_id: model.category_id,
            name: model.name,
            description: model.description,
            price: model.price,
            original_price: model.original_price,
            stock: model.stock,
            rating: model.rating,
            image_url: model.image_url,
            product_type: model.product_type,
            region: model.region,
            pickup_info: model.pickup_info,
            solidaire: model.solidaire,
            is_restaurant: model.is_restaurant,
            is_active: model.is_active,
            featured: model.featured,
            contents: Vec::new(),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Favorite {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<favorites::Model> for Favorite {
    fn from(model: favorites::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            seller_id: model.seller_id,
            total_amount: model.total_amount,
            status: model.status,
            payment_intent_id: model.payment_intent_id,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: i64,
    pub seller_ready: bool,
    pub picked_up: bool,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            seller_id: model.seller_id,
            product_name: model.product_name,
            quantity: model.quantity,
            price_at_purchase: model.price_at_purchase,
            seller_ready: model.seller_ready,
            picked_up: model.picked_up,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            message: model.message,
            read: model.read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
