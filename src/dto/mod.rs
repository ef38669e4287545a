pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod favorites;
pub mod notifications;
pub mod orders;
pub mod products;
