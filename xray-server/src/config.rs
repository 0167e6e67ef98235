//! Server configuration
//!
//! Everything is read from the environment once at startup.

use std::time::Duration;

use anyhow::{Context, Result, bail};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which trace store backs the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub store: StoreBackend,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let store = match lookup("XRAY_STORE").as_deref().map(str::trim) {
            Some("memory") => StoreBackend::Memory,
            Some("postgres") => match database_url {
                Some(database_url) => StoreBackend::Postgres { database_url },
                None => bail!("XRAY_STORE=postgres requires DATABASE_URL"),
            },
            Some(other) => bail!("Unknown XRAY_STORE '{}', expected 'postgres' or 'memory'", other),
            None => match database_url {
                Some(database_url) => StoreBackend::Postgres { database_url },
                None => StoreBackend::Memory,
            },
        };

        Ok(Self {
            bind_addr: lookup("XRAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            store,
            db_max_connections: parse_or(
                &lookup,
                "XRAY_DB_MAX_CONNECTIONS",
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
            db_acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "XRAY_DB_ACQUIRE_TIMEOUT",
                DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "XRAY_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_use_memory_store() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.db_acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/xray")]).unwrap();

        assert_eq!(
            config.store,
            StoreBackend::Postgres {
                database_url: "postgres://localhost/xray".to_string()
            }
        );
    }

    #[test]
    fn test_explicit_memory_overrides_database_url() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/xray"),
            ("XRAY_STORE", "memory"),
        ])
        .unwrap();

        assert_eq!(config.store, StoreBackend::Memory);
    }

    #[test]
    fn test_postgres_without_url_is_rejected() {
        assert!(config_from(&[("XRAY_STORE", "postgres")]).is_err());
        assert!(config_from(&[("XRAY_STORE", "sqlite")]).is_err());
    }

    #[test]
    fn test_numeric_overrides() {
        let config = config_from(&[
            ("XRAY_BIND_ADDR", "127.0.0.1:9000"),
            ("XRAY_DB_MAX_CONNECTIONS", "25"),
            ("XRAY_REQUEST_TIMEOUT", "5"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.db_max_connections, 25);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config_from(&[("XRAY_DB_MAX_CONNECTIONS", "lots")]).unwrap_err();
        assert!(err.to_string().contains("XRAY_DB_MAX_CONNECTIONS"));
    }
}
