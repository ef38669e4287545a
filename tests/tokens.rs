use greencart_api::{
    entity::enums::{AccountStatus, UserRole},
    services::{
        auth_service::{check_login_status, hash_password, is_valid_siret},
        category_service::slugify,
    },
    token::{decode_token, digest_reset_token, generate_reset_token, issue_token},
};
use uuid::Uuid;

const SECRET: &str = "test-secret";

#[test]
fn issued_token_decodes_to_same_user_and_role() {
    let user_id = Uuid::new_v4();
    let token = issue_token(SECRET, user_id, UserRole::Producer, 1).expect("token");

    let claims = decode_token(SECRET, &token).expect("claims");
    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.role, UserRole::Producer);
    assert!(claims.exp > claims.iat);
}

#[test]
fn token_signed_with_other_secret_is_rejected() {
    let token = issue_token(SECRET, Uuid::new_v4(), UserRole::Consumer, 1).expect("token");
    let err = decode_token("another-secret", &token).unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
}

#[test]
fn expired_token_is_rejected() {
    let token = issue_token(SECRET, Uuid::new_v4(), UserRole::Consumer, -2).expect("token");
    assert!(decode_token(SECRET, &token).is_err());
}

#[test]
fn reset_tokens_are_random_and_stored_as_digest() {
    let a = generate_reset_token();
    let b = generate_reset_token();
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);

    let digest = digest_reset_token(&a);
    assert_eq!(digest.len(), 64);
    assert_ne!(digest, a);
    assert_eq!(digest, digest_reset_token(&a));
}

#[test]
fn password_hash_is_salted() {
    let first = hash_password("secret123").expect("hash");
    let second = hash_password("secret123").expect("hash");
    assert!(first.starts_with("$argon2"));
    assert_ne!(first, second);
}

#[test]
fn sellers_need_approval_to_sign_in() {
    assert!(check_login_status(UserRole::Producer, AccountStatus::Approved).is_ok());
    assert!(check_login_status(UserRole::Consumer, AccountStatus::Pending).is_ok());

    let pending = check_login_status(UserRole::Restaurant, AccountStatus::Pending).unwrap_err();
    assert!(pending.to_string().contains("pending approval"));

    let rejected = check_login_status(UserRole::Producer, AccountStatus::Rejected).unwrap_err();
    assert!(rejected.to_string().contains("rejected"));
}

#[test]
fn siret_must_be_fourteen_digits() {
    assert!(is_valid_siret("12345678901234"));
    assert!(!is_valid_siret("1234567890123"));
    assert!(!is_valid_siret("1234567890123A"));
    assert!(!is_valid_siret(""));
}

#[test]
fn slugs_are_lowercase_and_dashed() {
    assert_eq!(slugify("Fruits & Légumes"), "fruits-legumes");
    assert_eq!(slugify("  Plats   préparés "), "plats-prepares");
}
