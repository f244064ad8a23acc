//! Wishlist routes. Every route resolves the user first, and wishlists that
//! belong to someone else are reported as missing.

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiJson, ApiSuccess, AppState, AuthedUser};
use crate::domain::aggregates::{Wishlist, WishlistUpdate, WishlistView};
use crate::domain::value_objects::parse_id;
use crate::{Result, StorefrontError};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    name: Option<String>,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBody {
    product_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    is_in_wishlist: bool,
}

async fn owner(s: &AppState, caller: &AuthedUser, raw: &str) -> Result<Uuid> {
    let user_id = parse_id(raw, "userId")?;
    caller.require_self_or_admin(user_id)?;
    s.services.accounts.get_user(user_id).await?;
    Ok(user_id)
}

async fn owned_wishlist(s: &AppState, user_id: Uuid, raw: &str) -> Result<Wishlist> {
    let wishlist = s.services.wishlists.find_wishlist(parse_id(raw, "wishlistId")?).await?;
    if wishlist.user_id != user_id {
        return Err(StorefrontError::not_found("Wishlist not found."));
    }
    Ok(wishlist)
}

async fn existing_product(s: &AppState, raw: Option<&str>) -> Result<Uuid> {
    let raw = raw.ok_or_else(|| StorefrontError::validation("Product ID is required."))?;
    let product = s.services.products.get_product_by_id(parse_id(raw, "productId")?).await?;
    Ok(product.id)
}

pub async fn create(State(s): State<AppState>, caller: AuthedUser, Path(user_id): Path<String>, ApiJson(body): ApiJson<CreateBody>) -> Result<ApiSuccess<Wishlist>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let wishlist = s.services.wishlists.create_wishlist(user_id, body.name, body.note).await?;
    Ok(ApiSuccess::created("Wishlist created successfully.", wishlist))
}

pub async fn update(State(s): State<AppState>, caller: AuthedUser, Path((user_id, wishlist_id)): Path<(String, String)>, ApiJson(body): ApiJson<WishlistUpdate>) -> Result<ApiSuccess<Wishlist>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let wishlist = owned_wishlist(&s, user_id, &wishlist_id).await?;
    let wishlist = s.services.wishlists.update_wishlist(wishlist.id, body).await?;
    Ok(ApiSuccess::ok("Wishlist updated successfully.", wishlist))
}

pub async fn get(State(s): State<AppState>, caller: AuthedUser, Path((user_id, wishlist_id)): Path<(String, String)>) -> Result<ApiSuccess<WishlistView>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let wishlist = owned_wishlist(&s, user_id, &wishlist_id).await?;
    let view = s.services.wishlists.get_wishlist_by_id(wishlist.id).await?;
    Ok(ApiSuccess::ok("Wishlist fetched successfully.", view))
}

pub async fn get_all(State(s): State<AppState>, caller: AuthedUser, Path(user_id): Path<String>) -> Result<ApiSuccess<Vec<WishlistView>>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let views = s.services.wishlists.get_all_wishlists_by_user_id(user_id).await?;
    Ok(ApiSuccess::ok("Wishlists fetched successfully.", views))
}

pub async fn remove(State(s): State<AppState>, caller: AuthedUser, Path((user_id, wishlist_id)): Path<(String, String)>) -> Result<ApiSuccess<Wishlist>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let wishlist = owned_wishlist(&s, user_id, &wishlist_id).await?;
    let removed = s.services.wishlists.delete_wishlist(wishlist.id).await?;
    Ok(ApiSuccess::ok("Wishlist deleted successfully.", removed))
}

pub async fn add_product(State(s): State<AppState>, caller: AuthedUser, Path((user_id, wishlist_id)): Path<(String, String)>, ApiJson(body): ApiJson<ProductBody>) -> Result<ApiSuccess<Wishlist>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let wishlist = owned_wishlist(&s, user_id, &wishlist_id).await?;
    let product_id = existing_product(&s, body.product_id.as_deref()).await?;
    let wishlist = s.services.wishlists.add_to_wishlist(wishlist.id, product_id).await?;
    Ok(ApiSuccess::ok("Product added to wishlist.", wishlist))
}

pub async fn remove_product(State(s): State<AppState>, caller: AuthedUser, Path((user_id, wishlist_id)): Path<(String, String)>, ApiJson(body): ApiJson<ProductBody>) -> Result<ApiSuccess<Wishlist>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let wishlist = owned_wishlist(&s, user_id, &wishlist_id).await?;
    let product_id = existing_product(&s, body.product_id.as_deref()).await?;
    if !wishlist.contains(product_id) {
        return Err(StorefrontError::not_found("Product not found in wishlist."));
    }
    let wishlist = s.services.wishlists.remove_from_wishlist(wishlist.id, product_id).await?;
    Ok(ApiSuccess::ok("Product removed from wishlist.", wishlist))
}

pub async fn clear(State(s): State<AppState>, caller: AuthedUser, Path((user_id, wishlist_id)): Path<(String, String)>) -> Result<ApiSuccess<Wishlist>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let wishlist = owned_wishlist(&s, user_id, &wishlist_id).await?;
    let wishlist = s.services.wishlists.clear_wishlist(wishlist.id).await?;
    Ok(ApiSuccess::ok("Wishlist cleared successfully.", wishlist))
}

pub async fn contains(State(s): State<AppState>, caller: AuthedUser, Path((user_id, wishlist_id, product_id)): Path<(String, String, String)>) -> Result<ApiSuccess<Membership>> {
    let user_id = owner(&s, &caller, &user_id).await?;
    let wishlist = owned_wishlist(&s, user_id, &wishlist_id).await?;
    let product_id = existing_product(&s, Some(&product_id)).await?;
    let is_in_wishlist = s.services.wishlists.is_in_wishlist(wishlist.id, product_id).await?;
    Ok(ApiSuccess::ok("Product presence checked.", Membership { is_in_wishlist }))
}
