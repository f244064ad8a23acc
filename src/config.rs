//! Process configuration, read from the environment after `.env` is loaded.

use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// In-memory storage when absent.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub jwt_secret: String,
    /// Permissive CORS when absent.
    pub cors_origin: Option<String>,
    pub max_category_depth: usize,
    pub cart_save_retries: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let cart_save_retries = parse_or(&lookup, "CART_SAVE_RETRIES", 5u32)?;
        if cart_save_retries == 0 {
            return Err(ConfigError::Invalid { name: "CART_SAVE_RETRIES", value: "0".into() });
        }
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            port: parse_or(&lookup, "PORT", 8083)?,
            jwt_secret,
            cors_origin: lookup("CORS_ORIGIN").filter(|s| !s.is_empty()),
            max_category_depth: parse_or(&lookup, "MAX_CATEGORY_DEPTH", 64)?,
            cart_save_retries,
        })
    }

    /// Defaults for tests and local runs against the in-memory store.
    pub fn for_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            port: 8083,
            jwt_secret: jwt_secret.into(),
            cors_origin: None,
            max_category_depth: 64,
            cart_save_retries: 5,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&'static str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&str, String> = vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.port, 8083);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.max_category_depth, 64);
        assert_eq!(cfg.cart_save_retries, 5);
    }

    #[test]
    fn test_missing_secret() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = config(&[("JWT_SECRET", "x"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for PORT: eighty");
        assert!(config(&[("JWT_SECRET", "x"), ("CART_SAVE_RETRIES", "0")]).is_err());
    }
}
