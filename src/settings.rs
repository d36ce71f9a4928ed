//! Runtime settings from environment variables (after `.env` is loaded by the binary).

use crate::error::ConfigError;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/books";
pub const DEFAULT_BASE_PATH: &str = "/api/v1/books";
const MEMORY_SCHEME: &str = "memory://";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: s.to_string(),
            }),
        }
    }
}

/// Where book documents live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres(String),
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub environment: Environment,
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Mount point of the book routes, e.g. `/api/v1/books`.
    pub books_base_path: String,
    /// Mounts `GET {base}/monthly-plan/:year`. Off unless asked for.
    pub monthly_plan_enabled: bool,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            environment: Environment::Development,
            database_url: DEFAULT_DATABASE_URL.into(),
            database_max_connections: 5,
            host: "0.0.0.0".into(),
            port: 3000,
            books_base_path: DEFAULT_BASE_PATH.into(),
            monthly_plan_enabled: false,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();
        if let Some(v) = lookup("APP_ENV") {
            s.environment = v.parse()?;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            s.database_url = v;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            s.database_max_connections = parse_number("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("HOST") {
            s.host = v;
        }
        if let Some(v) = lookup("PORT") {
            s.port = parse_number("PORT", &v)?;
        }
        if let Some(v) = lookup("BOOKS_BASE_PATH") {
            s.books_base_path = normalize_base_path(&v)?;
        }
        if let Some(v) = lookup("BOOKS_MONTHLY_PLAN_ENABLED") {
            s.monthly_plan_enabled = parse_flag("BOOKS_MONTHLY_PLAN_ENABLED", &v)?;
        }
        if let Some(v) = lookup("MAX_BODY_BYTES") {
            s.max_body_bytes = parse_number("MAX_BODY_BYTES", &v)?;
        }
        s.storage()?;
        Ok(s)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn storage(&self) -> Result<StorageBackend, ConfigError> {
        let url = self.database_url.trim();
        if url.starts_with(MEMORY_SCHEME) {
            Ok(StorageBackend::Memory)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(StorageBackend::Postgres(url.to_string()))
        } else {
            Err(ConfigError::UnsupportedDatabaseUrl(url.to_string()))
        }
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

/// Leading slash, no trailing slash, never the bare root.
fn normalize_base_path(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() || !trimmed.starts_with('/') {
        return Err(ConfigError::Invalid {
            key: "BOOKS_BASE_PATH",
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
