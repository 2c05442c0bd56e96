use std::str::FromStr;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;

use crate::domain::order::DEFAULT_TAX_RATE;

// ============================================================================
// Service Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL. `None` runs on the seeded in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub http_host: String,
    pub http_port: u16,
    pub tax_rate: Decimal,
    /// Attempts per checkout when the failure is transient
    pub checkout_max_attempts: u32,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let tax_rate: Decimal = parse_or(var("TAX_RATE"), "TAX_RATE", DEFAULT_TAX_RATE)?;
        if tax_rate.is_sign_negative() {
            bail!("TAX_RATE must not be negative, got {tax_rate}");
        }

        let checkout_max_attempts: u32 = parse_or(var("CHECKOUT_MAX_ATTEMPTS"), "CHECKOUT_MAX_ATTEMPTS", 2)?;
        if checkout_max_attempts == 0 {
            bail!("CHECKOUT_MAX_ATTEMPTS must be at least 1");
        }

        let db_max_connections: u32 = parse_or(var("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?;
        if db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }

        Ok(Self {
            database_url: var("DATABASE_URL"),
            db_max_connections,
            http_host: var("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            http_port: parse_or(var("HTTP_PORT"), "HTTP_PORT", 8080)?,
            tax_rate,
            checkout_max_attempts,
        })
    }
}

fn parse_or<T>(raw: Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {value:?}")),
        None => Ok(default),
    }
}
