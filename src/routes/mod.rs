use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod doc;
pub mod favorites;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod params;
pub mod products;
pub mod shop;
pub mod upload;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/shop", shop::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/favorites", favorites::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
        .nest("/upload", upload::router(max_upload_bytes))
}
