//! OpenSASE Storefront
//!
//! Storefront backend for browsing and shopping a product catalog.
//!
//! ## Features
//! - Hierarchical categories with re-parenting on delete
//! - One shopping cart per user with quantity merge
//! - Named wishlists with set semantics
//! - PostgreSQL or in-memory persistence

use thiserror::Error;
use uuid::Uuid;

pub mod api;
pub mod config;
pub mod domain;
pub mod repository;
pub mod service;

pub use config::AppConfig;
pub use domain::aggregates::{
    Cart, CartItem, Category, CategoryPatch, NewCategory, NewProduct, NewUser, Product, Role,
    User, Wishlist,
};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("Category hierarchy contains a cycle at {0}")]
    CycleDetected(Uuid),

    #[error("Category hierarchy is deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl StorefrontError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Stable machine-readable code carried in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Duplicate(_) => "DUPLICATE_ERROR",
            Self::CycleDetected(_) => "CYCLE_DETECTED",
            Self::DepthExceeded(_) => "DEPTH_EXCEEDED",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthorized(_) => "AUTH_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Storage(_) => "SERVER_ERROR",
        }
    }
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Duplicate(db.message().to_string())
            }
            _ => Self::Storage(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(domain::value_objects::describe_validation(&e))
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
