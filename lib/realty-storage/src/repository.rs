//! Repository traits for listing storage.
//!
//! - `PropertyRepository`: CRUD with optimistic-concurrency updates
//! - `RepositoryConnection`: Database connection and initialization

use async_trait::async_trait;

use crate::{Property, StorageError, StoreConfig};

/// Trait for database connection and initialization.
///
/// This trait abstracts the database connection lifecycle, allowing
/// different backends to implement their own connection and migration logic.
#[async_trait]
pub trait RepositoryConnection: Sized + Send + Sync {
    /// Connect to the database using the provided configuration.
    async fn connect(config: impl Into<StoreConfig> + Send) -> Result<Self, StorageError>;

    /// Initialize the database schema (run migrations).
    async fn initialize(&self) -> Result<(), StorageError>;
}

/// Storage for [`Property`] listings.
///
/// Implementations are shared between concurrent callers without external
/// locking. Each operation is a single independent statement; none is retried.
///
/// # Versioning
///
/// A stored property starts at `version = 1`. The only transition is
/// `v -> v + 1`, performed by [`update`](Self::update) when the caller's
/// `version` still matches the stored one. Callers that lose the race get
/// [`StorageError::EditConflict`] and must re-fetch before trying again.
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Store a new listing.
    ///
    /// Any `id`, `created_at` or `version` on the input is ignored. Returns the
    /// listing with its assigned `id`, `created_at`, and `version = 1`.
    async fn insert(&self, property: Property) -> Result<Property, StorageError>;

    /// Fetch a listing by id.
    ///
    /// Fails with [`StorageError::RecordNotFound`] for `id < 1` (without
    /// touching storage) or when no row exists.
    async fn get(&self, id: i64) -> Result<Property, StorageError>;

    /// Overwrite every mutable field of a stored listing.
    ///
    /// Succeeds only while the stored version equals `property.version`, and
    /// returns the listing with its incremented version. A missing id and a
    /// stale version both fail with [`StorageError::EditConflict`].
    async fn update(&self, property: Property) -> Result<Property, StorageError>;

    /// Permanently remove a listing.
    ///
    /// Fails with [`StorageError::RecordNotFound`] for `id < 1` or when
    /// nothing was deleted.
    async fn delete(&self, id: i64) -> Result<(), StorageError>;
}

/// Reject ids that can never name a row, before any storage round trip.
pub fn ensure_valid_id(id: i64) -> Result<(), StorageError> {
    if id < 1 {
        return Err(StorageError::RecordNotFound);
    }
    Ok(())
}
