use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::{ApiJson, ApiSuccess, AppState, AuthedUser};
use crate::domain::aggregates::{Category, CategoryAncestry, CategoryDetail, CategoryNode, CategoryPatch, NewCategory};
use crate::domain::value_objects::parse_id;
use crate::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenParam {
    include_children: Option<String>,
}

impl ChildrenParam {
    fn enabled(&self) -> bool { self.include_children.as_deref() == Some("true") }
}

pub async fn add(State(s): State<AppState>, caller: AuthedUser, ApiJson(input): ApiJson<NewCategory>) -> Result<ApiSuccess<Category>> {
    caller.require_admin()?;
    let category = s.services.categories.add_category(input).await?;
    Ok(ApiSuccess::created("Category added successfully", category))
}

pub async fn get_all(State(s): State<AppState>, _: AuthedUser, Query(p): Query<ChildrenParam>) -> Result<ApiSuccess<Vec<CategoryNode>>> {
    let categories = s.services.categories.get_all_categories(p.enabled()).await?;
    Ok(ApiSuccess::ok("Categories fetched successfully", categories))
}

pub async fn get_roots(State(s): State<AppState>, _: AuthedUser, Query(p): Query<ChildrenParam>) -> Result<ApiSuccess<Vec<CategoryNode>>> {
    let categories = s.services.categories.get_root_categories(p.enabled()).await?;
    Ok(ApiSuccess::ok("Root categories fetched successfully", categories))
}

pub async fn get_by_id(State(s): State<AppState>, _: AuthedUser, Path(id): Path<String>, Query(p): Query<ChildrenParam>) -> Result<ApiSuccess<CategoryDetail>> {
    let id = parse_id(&id, "category ID")?;
    let category = s.services.categories.get_category_by_id(id, p.enabled()).await?;
    Ok(ApiSuccess::ok("Category fetched successfully", category))
}

pub async fn get_ancestors(State(s): State<AppState>, _: AuthedUser, Path(id): Path<String>) -> Result<ApiSuccess<CategoryAncestry>> {
    let id = parse_id(&id, "category ID")?;
    let ancestry = s.services.categories.get_category_with_ancestors(id).await?;
    Ok(ApiSuccess::ok("Category ancestors fetched successfully", ancestry))
}

pub async fn get_children(State(s): State<AppState>, _: AuthedUser, Path(id): Path<String>) -> Result<ApiSuccess<Vec<CategoryNode>>> {
    let id = parse_id(&id, "parent category ID")?;
    let children = s.services.categories.get_categories_by_parent(id).await?;
    Ok(ApiSuccess::ok("Subcategories fetched successfully", children))
}

pub async fn update(State(s): State<AppState>, caller: AuthedUser, Path(id): Path<String>, ApiJson(patch): ApiJson<CategoryPatch>) -> Result<ApiSuccess<Category>> {
    caller.require_admin()?;
    let id = parse_id(&id, "category ID")?;
    let category = s.services.categories.update_category(id, patch).await?;
    Ok(ApiSuccess::ok("Category updated successfully", category))
}

pub async fn remove(State(s): State<AppState>, caller: AuthedUser, Path(id): Path<String>) -> Result<ApiSuccess<Category>> {
    caller.require_admin()?;
    let id = parse_id(&id, "category ID")?;
    let category = s.services.categories.delete_category(id).await?;
    Ok(ApiSuccess::ok("Category deleted successfully", category))
}
