//! Realty Storage - Core types and traits for persisting real-estate listings.
//!
//! This crate provides the backend-agnostic half of listing storage. Backends
//! (`realty-storage-postgres`, `realty-storage-memory`) implement the
//! repository traits defined here.
//!
//! # Core Concepts
//!
//! - **Property**: A listing. Its identity, creation time and version are
//!   assigned by the store.
//! - **Attribute map**: An open, string-keyed collection of scalars
//!   (`features`, `nearby`) stored as one serialized column.
//! - **Optimistic concurrency**: Updates carry the version the caller last
//!   read; the store rejects stale writers with `EditConflict` instead of
//!   locking readers.
//!
//! # Traits
//!
//! - [`PropertyRepository`]: CRUD with compare-and-swap updates
//! - [`RepositoryConnection`]: Connection and schema initialization
//! - [`Storable`]: Table metadata and bindable column values

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

mod attributes;
mod config;
mod envelope;
mod error;
mod property;
mod query;
mod repository;
mod service;
mod storable;
mod time;
mod validator;

pub use attributes::{AttributeMap, Features, Nearby, Scalar};
pub use config::{
    ConnectionConfig, DEFAULT_MAX_CONNECTIONS, DEFAULT_STATEMENT_TIMEOUT, StoreConfig,
};
pub use envelope::{Envelope, envelope, error_envelope};
pub use error::{ErrorKind, StorageError};
pub use property::{
    MAX_FEATURES, MAX_NEARBY, MAX_TITLE_BYTES, MAX_TOKENS, Property, PropertyInput, PropertyPatch,
    parse_id,
};
pub use query::{Assignment, ColumnType, Delete, Filter, Insert, Query, Update, Value};
pub use repository::{PropertyRepository, RepositoryConnection, ensure_valid_id};
pub use service::Properties;
pub use storable::Storable;
pub use time::StorageDatetime;
pub use validator::{ValidationErrors, Validator, unique};
