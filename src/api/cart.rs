use axum::extract::{Path, State};
use serde::Deserialize;

use super::{ApiJson, ApiSuccess, AppState, AuthedUser};
use crate::domain::aggregates::{CartItemInput, CartView};
use crate::domain::value_objects::parse_id;
use crate::{Result, StorefrontError};

#[derive(Debug, Deserialize)]
pub struct AddItemBody {
    item: Option<CartItemInput>,
}

pub async fn add_item(State(s): State<AppState>, caller: AuthedUser, Path(user_id): Path<String>, ApiJson(body): ApiJson<AddItemBody>) -> Result<ApiSuccess<CartView>> {
    let user_id = parse_id(&user_id, "userId")?;
    caller.require_self_or_admin(user_id)?;
    let item = body.item.ok_or_else(|| StorefrontError::validation("Invalid product item"))?;
    let cart = s.services.carts.add_item_to_cart(user_id, item).await?;
    Ok(ApiSuccess::ok("Item added to cart", cart))
}

pub async fn get(State(s): State<AppState>, caller: AuthedUser, Path(user_id): Path<String>) -> Result<ApiSuccess<CartView>> {
    let user_id = parse_id(&user_id, "userId")?;
    caller.require_self_or_admin(user_id)?;
    let cart = s
        .services
        .carts
        .get_cart_by_user_id(user_id)
        .await?
        .ok_or_else(|| StorefrontError::not_found("Cart not found"))?;
    Ok(ApiSuccess::ok("Cart fetched successfully", cart))
}

pub async fn remove_item(State(s): State<AppState>, caller: AuthedUser, Path((user_id, product_id)): Path<(String, String)>) -> Result<ApiSuccess<CartView>> {
    let user_id = parse_id(&user_id, "userId")?;
    caller.require_self_or_admin(user_id)?;
    let cart = s.services.carts.remove_item_from_cart(user_id, &product_id).await?;
    Ok(ApiSuccess::ok("Item removed from cart", cart))
}

pub async fn clear(State(s): State<AppState>, caller: AuthedUser, Path(user_id): Path<String>) -> Result<ApiSuccess<CartView>> {
    let user_id = parse_id(&user_id, "userId")?;
    caller.require_self_or_admin(user_id)?;
    let cart = s.services.carts.clear_cart(user_id).await?;
    Ok(ApiSuccess::ok("Cart cleared successfully", cart))
}
