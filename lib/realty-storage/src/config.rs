//! Connection settings shared by the database backends.

use std::time::Duration;

use crate::StorageError;

/// Deadline applied to every store operation.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound on pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

/// Connection configuration for database backends.
///
/// This enum is extensible for future authentication methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    /// Connect using a database URL string.
    Url(String),
}

impl From<&str> for ConnectionConfig {
    fn from(url: &str) -> Self {
        ConnectionConfig::Url(url.to_string())
    }
}

impl From<String> for ConnectionConfig {
    fn from(url: String) -> Self {
        ConnectionConfig::Url(url)
    }
}

impl From<&String> for ConnectionConfig {
    fn from(url: &String) -> Self {
        ConnectionConfig::Url(url.clone())
    }
}

/// Everything a backend needs to open its pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub connection: ConnectionConfig,
    pub max_connections: u32,
    pub statement_timeout: Duration,
}

impl StoreConfig {
    pub fn new(connection: impl Into<ConnectionConfig>) -> Self {
        Self {
            connection: connection.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    /// Read `DATABASE_URL` and, optionally, `DATABASE_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| StorageError::StorageError("DATABASE_URL is not set".to_string()))?;

        let mut config = Self::new(url);
        if let Some(raw) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    StorageError::StorageError(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer, got {raw:?}"
                    ))
                })?;
        }
        Ok(config)
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_statement_timeout(mut self, statement_timeout: Duration) -> Self {
        self.statement_timeout = statement_timeout;
        self
    }

    pub fn url(&self) -> &str {
        match &self.connection {
            ConnectionConfig::Url(url) => url,
        }
    }
}

impl From<ConnectionConfig> for StoreConfig {
    fn from(connection: ConnectionConfig) -> Self {
        Self::new(connection)
    }
}

impl From<&str> for StoreConfig {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for StoreConfig {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<&String> for StoreConfig {
    fn from(url: &String) -> Self {
        Self::new(url)
    }
}
