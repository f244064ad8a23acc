//! Cart Aggregate

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{is_storable_price, parse_id, Quantity};
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: Uuid,
    user_id: Uuid,
    items: Vec<CartItem>,
    total_price: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: Quantity,
    /// Kept as a string in stored documents so the exact value survives.
    #[serde(with = "rust_decimal::serde::str")]
    pub price_at_addition: Decimal,
}

impl CartItem {
    /// `None` when price times quantity leaves the decimal range.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price_at_addition.checked_mul(Decimal::from(self.quantity.value()))
    }
}

fn total_of(items: &[CartItem]) -> Result<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, i| i.line_total().and_then(|line| acc.checked_add(line)))
        .ok_or_else(|| StorefrontError::validation("Cart total is too large"))
}

/// Unchecked line as submitted by a client.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub price_at_addition: Option<Decimal>,
}

impl CartItemInput {
    pub fn into_item(self) -> Result<CartItem> {
        let (Some(product_id), Some(quantity), Some(price)) =
            (self.product_id, self.quantity, self.price_at_addition)
        else {
            return Err(StorefrontError::validation("Invalid product item"));
        };
        let product_id = parse_id(&product_id, "productId")?;
        let quantity = Quantity::positive(quantity)?;
        if !is_storable_price(price) {
            return Err(StorefrontError::validation("Invalid product item"));
        }
        Ok(CartItem { product_id, quantity, price_at_addition: price })
    }
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), user_id, items: vec![], total_price: Decimal::ZERO,
            version: 0, created_at: now, updated_at: now,
        }
    }

    /// Rebuilds a stored cart; the total is recomputed, never trusted.
    pub fn restore(
        id: Uuid, user_id: Uuid, items: Vec<CartItem>, version: i64,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        let total_price = total_of(&items)?;
        Ok(Self { id, user_id, items, total_price, version, created_at, updated_at })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn total_price(&self) -> Decimal { self.total_price }
    pub fn version(&self) -> i64 { self.version }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn item(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Merges into an existing line by product; the first captured price is kept.
    /// The cart is left untouched when the merged quantity or the total overflows.
    pub fn add_item(&mut self, item: CartItem) -> Result<()> {
        let mut items = self.items.clone();
        match items.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.checked_add(item.quantity)?,
            None => items.push(item),
        }
        self.total_price = total_of(&items)?;
        self.items = items;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Takes one unit off a line, dropping the line at zero.
    pub fn decrement_item(&mut self, product_id: Uuid) -> Result<()> {
        let pos = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| StorefrontError::not_found("Item not found in cart"))?;
        match self.items[pos].quantity.decrement() {
            Some(q) => self.items[pos].quantity = q,
            None => { self.items.remove(pos); }
        }
        self.recalculate()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.total_price = Decimal::ZERO;
        self.updated_at = Utc::now();
    }

    pub(crate) fn advance_version(&mut self) { self.version += 1; }

    pub fn populate(self, products: &HashMap<Uuid, Product>) -> CartView {
        let items = self
            .items
            .into_iter()
            .map(|i| CartLineView {
                product: products.get(&i.product_id).cloned(),
                product_id: i.product_id,
                quantity: i.quantity,
                price_at_addition: i.price_at_addition,
            })
            .collect();
        CartView {
            id: self.id, user_id: self.user_id, items, total_price: self.total_price,
            created_at: self.created_at, updated_at: self.updated_at,
        }
    }

    fn recalculate(&mut self) -> Result<()> {
        self.total_price = total_of(&self.items)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Cart with product references resolved.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLineView>,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: Uuid,
    pub product: Option<Product>,
    pub quantity: Quantity,
    pub price_at_addition: Decimal,
}
