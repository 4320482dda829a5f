use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Upper bound on how long a store call waits for a pooled connection.
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
    /// Shard bits embedded in generated ids.
    pub id_shard: u16,
}

/// Boundary with the external session collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Request header carrying the authenticated user's id.
    pub viewer_header: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite::memory:".to_string()),
                max_connections: env_or("DB_MAX_CONNECTIONS", 20),
                min_connections: env_or("DB_MIN_CONNECTIONS", 1),
                acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 8),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("SERVER_PORT", 4000),
                cors_origin: env::var("CORS_ORIGIN")
                    .ok()
                    .filter(|origin| !origin.is_empty()),
                id_shard: env_or("ID_SHARD", 0),
            },
            session: SessionConfig {
                viewer_header: env::var("VIEWER_HEADER")
                    .unwrap_or_else(|_| "x-viewer-id".to_string())
                    .to_lowercase(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.id_shard >= 1024 {
            return Err(AppError::ConfigurationError(format!(
                "ID_SHARD must be less than 1024, got {}",
                self.server.id_shard
            )));
        }
        if self.session.viewer_header.trim().is_empty() {
            return Err(AppError::ConfigurationError(
                "VIEWER_HEADER must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// In-memory SQLite configuration used by tests and local runs.
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
                min_connections: 1,
                acquire_timeout_secs: 30,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origin: None,
                id_shard: 1,
            },
            session: SessionConfig {
                viewer_header: "x-viewer-id".to_string(),
            },
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_defaults() {
        let config = Config::in_memory();
        assert!(config.database.is_sqlite());
        assert!(config.database.is_in_memory());
        assert_eq!(config.database.max_connections, 1);
        assert_eq!(config.server_address(), "127.0.0.1:0");
    }

    #[test]
    fn test_database_kind_detection() {
        let mut config = Config::in_memory();
        config.database.url = "postgresql://localhost/tuiter".to_string();
        assert!(!config.database.is_sqlite());
        assert!(!config.database.is_in_memory());
        assert_eq!(config.database.acquire_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_out_of_range_shard_is_a_configuration_error() {
        let mut config = Config::in_memory();
        assert!(config.validate().is_ok());

        config.server.id_shard = 1024;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("TUITER_TEST_GARBAGE_PORT", "not-a-number");
        assert_eq!(env_or::<u16>("TUITER_TEST_GARBAGE_PORT", 4000), 4000);
        std::env::set_var("TUITER_TEST_GOOD_PORT", "8080");
        assert_eq!(env_or::<u16>("TUITER_TEST_GOOD_PORT", 4000), 8080);
    }
}
