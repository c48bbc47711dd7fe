//! PostgreSQL-backed [`PropertyRepository`].

use async_trait::async_trait;
use realty_storage::{
    Delete, Insert, Property, PropertyRepository, Query, RepositoryConnection, StorageError,
    StoreConfig, Update, ensure_valid_id,
};
use tracing::debug;

use crate::record::{ASSIGNED_COLUMNS, apply_assigned, property_from_row};
use crate::{MIGRATOR, PgPool};

/// Listing storage over a shared connection pool.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct PgPropertyRepository {
    pool: PgPool,
}

impl PgPropertyRepository {
    /// Create a new repository with the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RepositoryConnection for PgPropertyRepository {
    async fn connect(config: impl Into<StoreConfig> + Send) -> Result<Self, StorageError> {
        let config = config.into();
        let pool = PgPool::connect(&config).await?;
        Ok(Self::new(pool))
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        debug!("running migrations");
        MIGRATOR
            .run(self.pool.inner())
            .await
            .map_err(|e| StorageError::StorageError(e.to_string()))
    }
}

#[async_trait]
impl PropertyRepository for PgPropertyRepository {
    #[tracing::instrument(skip_all)]
    async fn insert(&self, mut property: Property) -> Result<Property, StorageError> {
        let insert = ASSIGNED_COLUMNS
            .iter()
            .fold(Insert::<Property>::from_item(&property)?, |insert, c| {
                insert.returning(*c)
            });

        let row = self.pool.insert(insert).await?;
        apply_assigned(&mut property, &row)?;
        Ok(property)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<Property, StorageError> {
        ensure_valid_id(id)?;

        let query = Query::<Property>::new().eq("id", id).limit(1);
        match self.pool.fetch_optional(query).await? {
            Some(row) => property_from_row(&row),
            None => Err(StorageError::RecordNotFound),
        }
    }

    #[tracing::instrument(skip(self, property), fields(id = property.id, version = property.version))]
    async fn update(&self, mut property: Property) -> Result<Property, StorageError> {
        ensure_valid_id(property.id)?;

        // Compare-and-swap on the version column: zero matched rows means the
        // row is gone or someone else already moved it past our version.
        let update = Update::<Property>::from_item(&property)?
            .set_raw("version", "version + 1")
            .eq("id", property.id)
            .eq("version", property.version);
        let update = ASSIGNED_COLUMNS
            .iter()
            .fold(update, |update, c| update.returning(*c));

        match self.pool.update(update).await? {
            Some(row) => {
                apply_assigned(&mut property, &row)?;
                Ok(property)
            }
            None => Err(StorageError::EditConflict),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        ensure_valid_id(id)?;

        let deleted = self.pool.delete(Delete::<Property>::new().eq("id", id)).await?;
        if deleted == 0 {
            return Err(StorageError::RecordNotFound);
        }
        Ok(())
    }
}
