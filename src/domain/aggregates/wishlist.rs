//! Wishlist Aggregate

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::non_blank;
use crate::{Result, StorefrontError};

pub const DEFAULT_WISHLIST_NAME: &str = "My Wishlist";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub note: Option<String>,
    pub products: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership change applied atomically by the repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductSetOp {
    Add(Uuid),
    Remove(Uuid),
    Clear,
}

impl Wishlist {
    pub fn create(user_id: Uuid, name: Option<String>, note: Option<String>) -> Result<Self> {
        let name = non_blank(name).ok_or_else(|| StorefrontError::validation("Name is required."))?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), name, user_id, note: non_blank(note),
            products: vec![], created_at: now, updated_at: now,
        })
    }

    pub fn default_for(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: DEFAULT_WISHLIST_NAME.to_string(), user_id, note: None,
            products: vec![], created_at: now, updated_at: now,
        }
    }

    pub fn contains(&self, product_id: Uuid) -> bool { self.products.contains(&product_id) }

    pub fn apply(&mut self, op: ProductSetOp) {
        match op {
            ProductSetOp::Add(pid) => {
                if !self.contains(pid) { self.products.push(pid); }
            }
            ProductSetOp::Remove(pid) => self.products.retain(|p| *p != pid),
            ProductSetOp::Clear => self.products.clear(),
        }
        self.updated_at = Utc::now();
    }

    pub fn apply_update(&mut self, update: &WishlistUpdate) {
        if let Some(name) = &update.name { self.name = name.clone(); }
        if let Some(note) = &update.note { self.note = Some(note.clone()); }
        self.updated_at = Utc::now();
    }

    /// Resolves product ids, skipping products that no longer exist.
    pub fn populate(self, products: &HashMap<Uuid, Product>) -> WishlistView {
        let resolved = self.products.iter().filter_map(|p| products.get(p).cloned()).collect();
        WishlistView {
            id: self.id, name: self.name, user_id: self.user_id, note: self.note,
            products: resolved, created_at: self.created_at, updated_at: self.updated_at,
        }
    }
}

/// Partial rename/re-note.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WishlistUpdate {
    pub name: Option<String>,
    pub note: Option<String>,
}

impl WishlistUpdate {
    pub fn normalized(self) -> Result<Self> {
        let name = match self.name {
            Some(n) => Some(non_blank(Some(n)).ok_or_else(|| StorefrontError::validation("Name cannot be empty."))?),
            None => None,
        };
        Ok(Self { name, note: self.note.map(|n| n.trim().to_string()) })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistView {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub note: Option<String>,
    pub products: Vec<Product>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
