//! HTTP surface.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::repository::Repositories;
use crate::service::Services;
use crate::{AppConfig, StorefrontError};

pub mod auth;
mod cart;
mod category;
mod product;
pub mod response;
mod user;
mod wishlist;

pub use auth::{AuthedUser, Claims, JwtVerifier};
pub use response::{ApiJson, ApiSuccess};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub repos: Repositories,
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(repos: Repositories, config: &AppConfig) -> Self {
        Self {
            services: Services::new(&repos, config),
            jwt: Arc::new(JwtVerifier::new(&config.jwt_secret)),
            repos,
        }
    }
}

pub fn router(state: AppState, cors_origin: Option<&str>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/category", post(category::add))
        .route("/api/category/getAll", get(category::get_all))
        .route("/api/category/root", get(category::get_roots))
        .route("/api/category/:id", get(category::get_by_id).put(category::update).delete(category::remove))
        .route("/api/category/:id/ancestors", get(category::get_ancestors))
        .route("/api/category/:id/children", get(category::get_children))
        .route("/api/product", post(product::create))
        .route("/api/product/:id", get(product::get_by_id))
        .route("/api/user", post(user::register))
        .route("/api/user/:userId", get(user::get).delete(user::remove))
        .route("/api/user/:userId/cart/add", post(cart::add_item))
        .route("/api/user/:userId/cart/get", get(cart::get))
        .route("/api/user/:userId/cart/delete/:productId", delete(cart::remove_item))
        .route("/api/user/:userId/cart/clear", delete(cart::clear))
        .route("/api/user/:userId/wishlist/create", post(wishlist::create))
        .route("/api/user/:userId/wishlist/getAll", get(wishlist::get_all))
        .route("/api/user/:userId/wishlist/update/:wishlistId", put(wishlist::update))
        .route("/api/user/:userId/wishlist/get/:wishlistId", get(wishlist::get))
        .route("/api/user/:userId/wishlist/delete/:wishlistId", delete(wishlist::remove))
        .route("/api/user/:userId/wishlist/:wishlistId/add", post(wishlist::add_product))
        .route("/api/user/:userId/wishlist/:wishlistId/remove", delete(wishlist::remove_product))
        .route("/api/user/:userId/wishlist/:wishlistId/clear", delete(wishlist::clear))
        .route("/api/user/:userId/wishlist/:wishlistId/is-in-wishlist/:productId", get(wishlist::contains))
        .fallback(|| async { StorefrontError::not_found("Route not found") })
        .layer(TraceLayer::new_for_http())
        .layer(cors(cors_origin))
        .with_state(state)
}

fn cors(origin: Option<&str>) -> CorsLayer {
    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        None => CorsLayer::permissive(),
    }
}

async fn health(axum::extract::State(s): axum::extract::State<AppState>) -> Result<Json<serde_json::Value>, StorefrontError> {
    s.repos.ping().await?;
    Ok(Json(serde_json::json!({"status": "healthy", "service": "opensase-storefront", "store": s.repos.backend_name()})))
}
