use sea_orm::entity::prelude::*;

use super::enums::{AccountStatus, UserRole};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
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
    /// SHA-256 hex digest of the outstanding reset token.
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Name shown to buyers: the business name when set, the person otherwise.
    pub fn display_name(&self) -> String {
        match self.company_name.as_deref().filter(|c| !c.is_empty()) {
            Some(company) => company.to_string(),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::products::Entity")]
    Products,
    #[sea_orm(has_one = "super::carts::Entity")]
    Cart,
    #[sea_orm(has_many = "super::favorites::Entity")]
    Favorites,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::carts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::favorites::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favorites.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
