//! Product record
//!
//! Products carry no invariants beyond field bounds; carts and wishlists only
//! reference them by id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::{is_storable_price, non_blank};
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub stock: i32,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub image: Option<String>,
}

impl Product {
    pub fn create(input: NewProduct) -> Result<Self> {
        let input = NewProduct {
            name: non_blank(input.name),
            description: non_blank(input.description),
            image: non_blank(input.image),
            ..input
        };
        input.validate()?;
        let (Some(name), Some(price), Some(image)) = (input.name, input.price, input.image) else {
            return Err(StorefrontError::validation("Name, price and image are required"));
        };
        if price.is_sign_negative() {
            return Err(StorefrontError::validation("Price cannot be negative"));
        }
        if !is_storable_price(price) {
            return Err(StorefrontError::validation("Price must have at most two decimal places and be below 10000000000"));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), name, description: input.description, price,
            category_id: input.category_id, stock: input.stock.unwrap_or(0), image,
            created_at: now, updated_at: now,
        })
    }
}
