use axum::Router;

pub mod inventory;
pub mod locations;
pub mod system;
pub mod templates;

/// Router for all data endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/templates", templates::router())
        .nest("/locations", locations::router())
        .nest("/inventory", inventory::router())
}
