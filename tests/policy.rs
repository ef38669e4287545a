use greencart_api::{
    entity::enums::{AccountStatus, UserRole},
    policy::{Action, Actor, Decision, Denial, Resource, authorize},
};
use uuid::Uuid;

fn actor(role: UserRole, status: AccountStatus) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role,
        status,
    }
}

#[test]
fn pending_producer_cannot_create_products() {
    let producer = actor(UserRole::Producer, AccountStatus::Pending);
    assert_eq!(
        authorize(&producer, Action::CreateProduct, Resource::None),
        Decision::Deny(Denial::NotApproved)
    );

    let rejected = actor(UserRole::Restaurant, AccountStatus::Rejected);
    assert_eq!(
        authorize(&rejected, Action::UploadProductImage, Resource::None),
        Decision::Deny(Denial::NotApproved)
    );
}

#[test]
fn approved_seller_edits_only_own_products() {
    let seller = actor(UserRole::Restaurant, AccountStatus::Approved);
    assert!(authorize(&seller, Action::CreateProduct, Resource::None).is_allowed());

    let own = Resource::Product { owner_id: seller.id };
    let other = Resource::Product {
        owner_id: Uuid::new_v4(),
    };
    assert!(authorize(&seller, Action::UpdateProduct, own).is_allowed());
    assert_eq!(
        authorize(&seller, Action::DeleteProduct, other),
        Decision::Deny(Denial::NotOwner)
    );
}

#[test]
fn consumers_shop_but_do_not_sell() {
    let consumer = actor(UserRole::Consumer, AccountStatus::Approved);
    for action in [Action::UseCart, Action::Checkout, Action::ManageFavorites] {
        assert!(authorize(&consumer, action, Resource::None).is_allowed());
    }
    assert_eq!(
        authorize(&consumer, Action::CreateProduct, Resource::None),
        Decision::Deny(Denial::WrongRole)
    );

    let producer = actor(UserRole::Producer, AccountStatus::Approved);
    assert_eq!(
        authorize(&producer, Action::UseCart, Resource::None),
        Decision::Deny(Denial::WrongRole)
    );
}

#[test]
fn order_access_follows_buyer_and_seller() {
    let buyer = actor(UserRole::Consumer, AccountStatus::Approved);
    let seller = actor(UserRole::Producer, AccountStatus::Approved);
    let stranger = actor(UserRole::Consumer, AccountStatus::Approved);
    let order = Resource::Order {
        buyer_id: buyer.id,
        seller_id: Some(seller.id),
    };

    assert!(authorize(&buyer, Action::ViewOrder, order).is_allowed());
    assert!(authorize(&seller, Action::ViewOrder, order).is_allowed());
    assert_eq!(
        authorize(&stranger, Action::ViewOrder, order),
        Decision::Deny(Denial::NotOwner)
    );

    assert!(authorize(&seller, Action::MarkOrderReady, order).is_allowed());
    assert_eq!(
        authorize(&buyer, Action::MarkOrderReady, order),
        Decision::Deny(Denial::WrongRole)
    );

    assert!(authorize(&buyer, Action::ConfirmPickup, order).is_allowed());
    assert_eq!(
        authorize(&stranger, Action::ConfirmPickup, order),
        Decision::Deny(Denial::NotOwner)
    );
}

#[test]
fn admin_moderates_but_does_not_shop() {
    let admin = actor(UserRole::Admin, AccountStatus::Approved);
    assert!(authorize(&admin, Action::Administer, Resource::None).is_allowed());
    assert!(
        authorize(
            &admin,
            Action::DeleteProduct,
            Resource::Product {
                owner_id: Uuid::new_v4()
            }
        )
        .is_allowed()
    );
    assert!(
        authorize(
            &admin,
            Action::ViewStudentProof,
            Resource::StudentProof {
                owner_id: Uuid::new_v4()
            }
        )
        .is_allowed()
    );
    assert_eq!(
        authorize(&admin, Action::Checkout, Resource::None),
        Decision::Deny(Denial::WrongRole)
    );

    let consumer = actor(UserRole::Consumer, AccountStatus::Approved);
    assert_eq!(
        authorize(&consumer, Action::Administer, Resource::None),
        Decision::Deny(Denial::WrongRole)
    );
}

#[test]
fn student_proof_is_private_to_its_owner() {
    let student = actor(UserRole::Consumer, AccountStatus::Approved);
    let other = actor(UserRole::Consumer, AccountStatus::Approved);
    let proof = Resource::StudentProof {
        owner_id: student.id,
    };
    assert!(authorize(&student, Action::ViewStudentProof, proof).is_allowed());
    assert_eq!(
        authorize(&other, Action::ViewStudentProof, proof),
        Decision::Deny(Denial::NotOwner)
    );
}

#[test]
fn product_images_are_deleted_by_their_uploader_or_an_admin() {
    let uploader = actor(UserRole::Producer, AccountStatus::Approved);
    let rival = actor(UserRole::Restaurant, AccountStatus::Approved);
    let admin = actor(UserRole::Admin, AccountStatus::Approved);
    let image = Resource::ProductImage {
        owner_id: uploader.id,
    };

    assert!(authorize(&uploader, Action::DeleteProductImage, image).is_allowed());
    assert!(authorize(&admin, Action::DeleteProductImage, image).is_allowed());
    assert_eq!(
        authorize(&rival, Action::DeleteProductImage, image),
        Decision::Deny(Denial::NotOwner)
    );

    let consumer = actor(UserRole::Consumer, AccountStatus::Approved);
    assert_eq!(
        authorize(&consumer, Action::DeleteProductImage, image),
        Decision::Deny(Denial::WrongRole)
    );
}

#[test]
fn denial_maps_to_forbidden() {
    let consumer = actor(UserRole::Consumer, AccountStatus::Approved);
    let err = authorize(&consumer, Action::Administer, Resource::None)
        .into_result()
        .unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
}
