//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{Result, StorefrontError};

/// Parses a store identifier, naming the offending field on failure.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| StorefrontError::validation(format!("Invalid {field} format")))
}

/// Flattens `validator` output into one message, fields in name order.
pub fn describe_validation(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(name, _)| *name);
    fields
        .iter()
        .flat_map(|(name, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("Invalid {name}"),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Trims and drops blank strings.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Largest unit price the `NUMERIC(12, 2)` product column can hold.
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Non-negative, at most two decimal places and within [`MAX_PRICE`].
/// Anything else would be rounded or rejected by the price columns.
pub fn is_storable_price(price: Decimal) -> bool {
    !price.is_sign_negative() && price.normalize().scale() <= 2 && price <= MAX_PRICE
}

/// Line quantity, never zero while the line exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn positive(value: i64) -> Result<Self> {
        if value <= 0 {
            return Err(StorefrontError::validation("Quantity must be greater than zero"));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| StorefrontError::validation("Quantity is too large"))
    }
    pub fn one() -> Self { Self(1) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn checked_add(&self, other: Quantity) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| StorefrontError::validation("Quantity is too large"))
    }
    /// `None` once the quantity would reach zero.
    pub fn decrement(&self) -> Option<Self> {
        if self.0 <= 1 { None } else { Some(Self(self.0 - 1)) }
    }
}

impl TryFrom<i64> for Quantity {
    type Error = StorefrontError;
    fn try_from(value: i64) -> Result<Self> { Self::positive(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}
