//! Permission rules for marketplace actions.
//!
//! Every check goes through [`authorize`], which only looks at the acting
//! user, the action and the resource it targets. Services turn a
//! [`Decision::Deny`] into an HTTP error.

use uuid::Uuid;

use crate::{
    entity::enums::{AccountStatus, UserRole},
    error::AppError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
    pub status: AccountStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    ListOwnProducts,
    UseCart,
    Checkout,
    ManageFavorites,
    ViewSellerOrders,
    MarkOrderReady,
    ConfirmPickup,
    ViewOrder,
    UploadProductImage,
    DeleteProductImage,
    UploadStudentProof,
    ViewStudentProof,
    Administer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    None,
    Product { owner_id: Uuid },
    /// Orders are split per seller at checkout, so one seller id covers an order.
    Order { buyer_id: Uuid, seller_id: Option<Uuid> },
    ProductImage { owner_id: Uuid },
    StudentProof { owner_id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    WrongRole,
    NotApproved,
    NotOwner,
}

impl Denial {
    pub fn message(self) -> &'static str {
        match self {
            Denial::WrongRole => "Your role does not allow this action",
            Denial::NotApproved => "Your account is not approved",
            Denial::NotOwner => "You do not own this resource",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Maps a denial to 403.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(AppError::Forbidden(denial.message().to_string())),
        }
    }
}

pub fn authorize(actor: &Actor, action: Action, resource: Resource) -> Decision {
    use Action::*;

    if actor.role == UserRole::Admin {
        return match action {
            // Admins moderate and read; they neither shop nor fulfil orders.
            UseCart | Checkout | ManageFavorites | MarkOrderReady | ConfirmPickup
            | CreateProduct | UploadStudentProof | ListOwnProducts | ViewSellerOrders => {
                Decision::Deny(Denial::WrongRole)
            }
            _ => Decision::Allow,
        };
    }

    match action {
        Administer => Decision::Deny(Denial::WrongRole),
        CreateProduct | ListOwnProducts | UploadProductImage | ViewSellerOrders => {
            seller_gate(actor)
        }
        UpdateProduct | DeleteProduct | DeleteProductImage => match seller_gate(actor) {
            Decision::Allow => owns(actor, resource),
            deny => deny,
        },
        MarkOrderReady => match seller_gate(actor) {
            Decision::Allow => match resource {
                Resource::Order {
                    seller_id: Some(seller),
                    ..
                } if seller == actor.id => Decision::Allow,
                _ => Decision::Deny(Denial::NotOwner),
            },
            deny => deny,
        },
        UseCart | Checkout | ManageFavorites | UploadStudentProof => consumer_gate(actor),
        ConfirmPickup => match consumer_gate(actor) {
            Decision::Allow => match resource {
                Resource::Order { buyer_id, .. } if buyer_id == actor.id => Decision::Allow,
                _ => Decision::Deny(Denial::NotOwner),
            },
            deny => deny,
        },
        ViewOrder => match resource {
            Resource::Order { buyer_id, .. } if buyer_id == actor.id => Decision::Allow,
            Resource::Order {
                seller_id: Some(seller),
                ..
            } if seller == actor.id => Decision::Allow,
            _ => Decision::Deny(Denial::NotOwner),
        },
        ViewStudentProof => owns(actor, resource),
    }
}

fn seller_gate(actor: &Actor) -> Decision {
    if !actor.role.is_seller() {
        Decision::Deny(Denial::WrongRole)
    } else if actor.status != AccountStatus::Approved {
        Decision::Deny(Denial::NotApproved)
    } else {
        Decision::Allow
    }
}

fn consumer_gate(actor: &Actor) -> Decision {
    if actor.role == UserRole::Consumer {
        Decision::Allow
    } else {
        Decision::Deny(Denial::WrongRole)
    }
}

fn owns(actor: &Actor, resource: Resource) -> Decision {
    let owner = match resource {
        Resource::Product { owner_id }
        | Resource::ProductImage { owner_id }
        | Resource::StudentProof { owner_id } => owner_id,
        _ => return Decision::Deny(Denial::NotOwner),
    };
    if owner == actor.id {
        Decision::Allow
    } else {
        Decision::Deny(Denial::NotOwner)
    }
}
