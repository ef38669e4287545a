use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum UserRole {
    #[sea_orm(string_value = "CONSUMER")]
    Consumer,
    #[sea_orm(string_value = "PRODUCER")]
    Producer,
    #[sea_orm(string_value = "RESTAURANT")]
    Restaurant,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

impl UserRole {
    pub fn is_seller(self) -> bool {
        matches!(self, UserRole::Producer | UserRole::Restaurant)
    }

    /// Status a freshly registered account starts with.
    pub fn initial_status(self) -> AccountStatus {
        if self.is_seller() {
            AccountStatus::Pending
        } else {
            AccountStatus::Approved
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AccountStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum NotificationKind {
    #[sea_orm(string_value = "NEW_ORDER")]
    NewOrder,
    #[sea_orm(string_value = "LOW_STOCK")]
    LowStock,
    #[sea_orm(string_value = "ORDER_READY")]
    OrderReady,
    #[sea_orm(string_value = "ORDER_PICKED_UP")]
    OrderPickedUp,
    #[sea_orm(string_value = "ACCOUNT_APPROVED")]
    AccountApproved,
    #[sea_orm(string_value = "ACCOUNT_REJECTED")]
    AccountRejected,
}
