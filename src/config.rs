//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Where records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::InvalidValue("STORAGE_BACKEND")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage backend
    pub storage_backend: StorageBackend,

    /// Database connection URL (postgres backend only)
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Page size used when a list request names none
    pub default_page_size: u32,

    /// Upper bound on requested page sizes
    pub max_page_size: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_backend: StorageBackend = lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let database_url = lookup("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_or(&lookup, "PORT", 3000)?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let default_page_size: u32 = parse_or(&lookup, "DEFAULT_PAGE_SIZE", 100)?;
        let max_page_size: u32 = parse_or(&lookup, "MAX_PAGE_SIZE", 1000)?;

        if default_page_size == 0 {
            return Err(ConfigError::InvalidValue("DEFAULT_PAGE_SIZE"));
        }
        if max_page_size < default_page_size {
            return Err(ConfigError::InvalidValue("MAX_PAGE_SIZE"));
        }

        Ok(Self {
            storage_backend,
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            default_page_size,
            max_page_size,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
