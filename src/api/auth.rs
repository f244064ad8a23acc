//! Bearer-token authentication.
//!
//! Tokens are issued elsewhere; this side only verifies HS256 signatures and
//! expiry, taking the token from `Authorization: Bearer` or a `token` cookie.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::domain::aggregates::Role;
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                StorefrontError::Unauthorized("Invalid or expired token".into())
            })
    }
}

/// The caller, as asserted by a verified token.
#[derive(Clone, Copy, Debug)]
pub struct AuthedUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthedUser {
    pub fn require_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            return Ok(());
        }
        Err(StorefrontError::Forbidden("Access denied. Admins only.".into()))
    }

    /// Owners act on their own resources; admins act on anyone's.
    pub fn require_self_or_admin(&self, user_id: Uuid) -> Result<()> {
        if self.id == user_id || self.role == Role::Admin {
            return Ok(());
        }
        Err(StorefrontError::Forbidden("Access denied.".into()))
    }
}

fn token_from(parts: &Parts) -> Option<&str> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);
    bearer.or_else(|| {
        parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .find_map(|pair| pair.trim().strip_prefix("token="))
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = token_from(parts)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StorefrontError::Unauthorized("Unauthorized".into()))?;
        let claims = state.jwt.verify(token)?;
        Ok(Self { id: claims.sub, role: claims.role })
    }
}
