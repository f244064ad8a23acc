use axum::extract::{Path, State};

use super::{ApiJson, ApiSuccess, AppState, AuthedUser};
use crate::domain::aggregates::{NewUser, User};
use crate::domain::value_objects::parse_id;
use crate::Result;

pub async fn register(State(s): State<AppState>, caller: AuthedUser, ApiJson(input): ApiJson<NewUser>) -> Result<ApiSuccess<User>> {
    caller.require_admin()?;
    let user = s.services.accounts.register(input).await?;
    Ok(ApiSuccess::created("User registered successfully", user))
}

pub async fn get(State(s): State<AppState>, caller: AuthedUser, Path(user_id): Path<String>) -> Result<ApiSuccess<User>> {
    let user_id = parse_id(&user_id, "userId")?;
    caller.require_self_or_admin(user_id)?;
    let user = s.services.accounts.get_user(user_id).await?;
    Ok(ApiSuccess::ok("User fetched successfully", user))
}

pub async fn remove(State(s): State<AppState>, caller: AuthedUser, Path(user_id): Path<String>) -> Result<ApiSuccess<User>> {
    caller.require_admin()?;
    let user_id = parse_id(&user_id, "userId")?;
    let user = s.services.accounts.delete_user(user_id).await?;
    Ok(ApiSuccess::ok("User deleted successfully", user))
}
