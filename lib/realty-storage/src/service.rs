//! Caller-side orchestration of the listing operations.
//!
//! [`Properties`] is what a transport handler talks to: it turns untrusted
//! input into a validated [`Property`] and hands it to the repository.

use tracing::debug;

use crate::{Property, PropertyInput, PropertyPatch, PropertyRepository, StorageError};

/// Typed accessor for listing operations over any [`PropertyRepository`].
#[derive(Debug, Clone)]
pub struct Properties<R> {
    repository: R,
}

impl<R: PropertyRepository> Properties<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Validate and store a new listing.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, input: PropertyInput) -> Result<Property, StorageError> {
        let property = input.into_property();
        if let Err(e) = property.check() {
            debug!("rejected new listing");
            return Err(e);
        }
        self.repository.insert(property).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn show(&self, id: i64) -> Result<Property, StorageError> {
        self.repository.get(id).await
    }

    /// Fetch, patch, re-validate, and write back a listing.
    ///
    /// The write is conditional on the version read here; a concurrent writer
    /// makes this fail with [`StorageError::EditConflict`]. No retry is attempted.
    #[tracing::instrument(skip(self, patch))]
    pub async fn edit(&self, id: i64, patch: PropertyPatch) -> Result<Property, StorageError> {
        let mut property = self.repository.get(id).await?;
        let read_version = property.version;

        patch.apply_to(&mut property);
        if let Err(e) = property.check() {
            debug!(version = read_version, "rejected listing edit");
            return Err(e);
        }

        self.repository.update(property).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: i64) -> Result<(), StorageError> {
        self.repository.delete(id).await
    }
}
