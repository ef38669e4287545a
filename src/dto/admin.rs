use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entity::enums::{AccountStatus, OrderStatus, UserRole},
    models::User,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub users: UserCounts,
    pub products: ProductCounts,
    pub orders: OrderCounts,
    /// Sum of paid order totals, minor units.
    pub revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCounts {
    pub total: i64,
    pub consumers: i64,
    pub producers: i64,
    pub restaurants: i64,
    pub admins: i64,
    pub pending_sellers: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductCounts {
    pub total: i64,
    pub active: i64,
    pub out_of_stock: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCounts {
    pub total: i64,
    pub paid: i64,
    pub pending: i64,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub region: Option<String>,
    pub company_name: Option<String>,
    pub role: Option<UserRole>,
    pub siret: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserStatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}
