//! PostgreSQL implementation for realty-storage.
//!
//! This crate renders the core statement builders to SQL, binds their values
//! with sqlx, and maps rows back to listings. Every statement is bound to the
//! configured deadline (three seconds by default).
//!
//! # Usage
//!
//! ```text
//! use realty_storage::{PropertyRepository, RepositoryConnection, StoreConfig};
//! use realty_storage_postgres::PgPropertyRepository;
//!
//! let repo = PgPropertyRepository::connect(StoreConfig::from_env()?).await?;
//! repo.initialize().await?;
//!
//! let stored = repo.insert(property).await?;
//! let fetched = repo.get(stored.id).await?;
//! ```
//!
//! The schema lives in `migrations/` and is embedded as [`MIGRATOR`].

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

mod executor;
mod record;
mod repository;

pub use executor::PgPool;
pub use record::{attributes, column, property_from_row};
pub use repository::PgPropertyRepository;

// Re-export sqlx migration types
pub use sqlx::migrate;
pub use sqlx::migrate::Migrator;

/// Embedded schema migrations for the `properties` table.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

// Re-export core types for convenience
pub use realty_storage::{
    ConnectionConfig, Property, PropertyRepository, RepositoryConnection, StorageError,
    StoreConfig,
};
