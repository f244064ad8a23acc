//! User record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::non_blank;
use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Seller,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl User {
    pub fn create(input: NewUser) -> Result<Self> {
        let input = NewUser {
            name: non_blank(input.name),
            email: non_blank(input.email).map(|e| e.to_lowercase()),
            role: input.role,
        };
        let (Some(name), Some(email)) = (&input.name, &input.email) else {
            return Err(StorefrontError::validation("Name and email are required"));
        };
        input.validate()?;
        Ok(Self {
            id: Uuid::now_v7(),
            name: name.clone(),
            email: email.clone(),
            role: input.role.unwrap_or_default(),
            created_at: Utc::now(),
        })
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_create() {
        let u = User::create(NewUser { name: Some("Ada".into()), email: Some(" Ada@Example.com ".into()), role: None }).unwrap();
        assert_eq!(u.email, "ada@example.com");
        assert_eq!(u.role, Role::User);
        assert!(!u.is_admin());
    }

    #[test]
    fn test_user_validation() {
        let err = User::create(NewUser { name: Some("Ada".into()), email: Some("nope".into()), role: None }).unwrap_err();
        assert_eq!(err.to_string(), "Invalid email format");
        let err = User::create(NewUser { name: None, email: Some("a@b.io".into()), role: None }).unwrap_err();
        assert_eq!(err.to_string(), "Name and email are required");
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"seller\"");
        assert_eq!(serde_json::from_str::<Role>("\"admin\"").unwrap(), Role::Admin);
    }
}
