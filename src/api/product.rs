use axum::extract::{Path, State};

use super::{ApiJson, ApiSuccess, AppState, AuthedUser};
use crate::domain::aggregates::{NewProduct, Product};
use crate::domain::value_objects::parse_id;
use crate::Result;

pub async fn create(State(s): State<AppState>, caller: AuthedUser, ApiJson(input): ApiJson<NewProduct>) -> Result<ApiSuccess<Product>> {
    caller.require_admin()?;
    let product = s.services.products.create_product(input).await?;
    Ok(ApiSuccess::created("Product created successfully", product))
}

pub async fn get_by_id(State(s): State<AppState>, _: AuthedUser, Path(id): Path<String>) -> Result<ApiSuccess<Product>> {
    let id = parse_id(&id, "productId")?;
    let product = s.services.products.get_product_by_id(id).await?;
    Ok(ApiSuccess::ok("Product fetched successfully", product))
}
