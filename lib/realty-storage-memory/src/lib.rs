//! In-process implementation for realty-storage.
//!
//! [`MemoryPropertyRepository`] keeps listings in a map behind a single
//! `tokio::sync::RwLock`. It follows the same contract as the PostgreSQL
//! backend: store-assigned identity, attribute maps kept in their encoded
//! form, and version compare-and-swap on update. Nothing is persisted
//! across process restarts.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use realty_storage::{
    Features, Nearby, Property, PropertyRepository, StorageDatetime, StorageError,
    ensure_valid_id,
};
use tokio::sync::RwLock;

/// A stored listing. Attribute maps are held as their column encoding.
#[derive(Debug, Clone)]
struct Row {
    property: Property,
    features: Vec<u8>,
    nearby: Vec<u8>,
}

impl Row {
    fn encode(mut property: Property) -> Result<Self, StorageError> {
        let features = property.features.encode()?;
        let nearby = property.nearby.encode()?;
        property.features = Features::new();
        property.nearby = Nearby::new();
        Ok(Self {
            property,
            features,
            nearby,
        })
    }

    fn decode(&self) -> Result<Property, StorageError> {
        let mut property = self.property.clone();
        property.features = Features::decode(&self.features)?;
        property.nearby = Nearby::decode(&self.nearby)?;
        Ok(property)
    }
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, Row>,
    last_id: i64,
}

/// Listing storage held in process memory.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryPropertyRepository {
    table: Arc<RwLock<Table>>,
}

impl MemoryPropertyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored listings.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PropertyRepository for MemoryPropertyRepository {
    #[tracing::instrument(skip_all)]
    async fn insert(&self, property: Property) -> Result<Property, StorageError> {
        let mut row = Row::encode(property)?;

        let mut table = self.table.write().await;
        table.last_id += 1;
        row.property.id = table.last_id;
        row.property.created_at = Some(StorageDatetime::now());
        row.property.version = 1;

        let stored = row.decode()?;
        table.rows.insert(stored.id, row);
        Ok(stored)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<Property, StorageError> {
        ensure_valid_id(id)?;

        let table = self.table.read().await;
        table
            .rows
            .get(&id)
            .ok_or(StorageError::RecordNotFound)?
            .decode()
    }

    #[tracing::instrument(skip(self, property), fields(id = property.id, version = property.version))]
    async fn update(&self, property: Property) -> Result<Property, StorageError> {
        ensure_valid_id(property.id)?;
        let mut candidate = Row::encode(property)?;

        let mut table = self.table.write().await;
        let current = match table.rows.get_mut(&candidate.property.id) {
            Some(row) if row.property.version == candidate.property.version => row,
            _ => return Err(StorageError::EditConflict),
        };

        candidate.property.created_at = current.property.created_at;
        candidate.property.version = current.property.version + 1;
        *current = candidate;
        current.decode()
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        ensure_valid_id(id)?;

        let mut table = self.table.write().await;
        match table.rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StorageError::RecordNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realty_storage::{PropertyInput, Scalar};

    fn applegate() -> Property {
        let mut features = Features::new();
        features.insert("Bedrooms", 1);
        let mut nearby = Nearby::new();
        nearby.insert("Hospital", "7km");

        PropertyInput {
            title: "6007 Applegate Lane".to_string(),
            description: "Two storey family house".to_string(),
            city: "Louisville".to_string(),
            location: "Applegate Lane".to_string(),
            price: 200000.0,
            features: Some(features),
            nearby: Some(nearby),
            amenities: Some(vec!["Parking".to_string()]),
            ..Default::default()
        }
        .into_property()
    }

    #[tokio::test]
    async fn insert_assigns_identity_and_first_version() {
        let repo = MemoryPropertyRepository::new();
        let mut candidate = applegate();
        candidate.id = 77;
        candidate.version = 5;

        let first = repo.insert(candidate.clone()).await.unwrap();
        let second = repo.insert(candidate).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.version, 1);
        assert!(first.created_at.is_some());
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn get_returns_caller_supplied_fields() {
        let repo = MemoryPropertyRepository::new();
        let candidate = applegate();
        let stored = repo.insert(candidate.clone()).await.unwrap();

        let fetched = repo.get(stored.id).await.unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.title, candidate.title);
        assert_eq!(fetched.features, candidate.features);
        assert_eq!(fetched.nearby, candidate.nearby);
        assert_eq!(fetched.amenities, candidate.amenities);
        assert_eq!(fetched.price, candidate.price);
    }

    #[tokio::test]
    async fn update_moves_version_forward_by_one() {
        let repo = MemoryPropertyRepository::new();
        let stored = repo.insert(applegate()).await.unwrap();

        let mut edited = stored.clone();
        edited.features.insert("Bedrooms", 2);
        let updated = repo.update(edited).await.unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.created_at, stored.created_at);
        assert_eq!(
            repo.get(stored.id).await.unwrap().features.get("Bedrooms"),
            Some(&Scalar::Integer(2))
        );

        let replay = repo.update(stored.clone()).await;
        assert!(matches!(replay, Err(StorageError::EditConflict)));
        assert_eq!(repo.get(stored.id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn update_cannot_move_created_at() {
        let repo = MemoryPropertyRepository::new();
        let stored = repo.insert(applegate()).await.unwrap();

        let mut edited = stored.clone();
        edited.created_at = None;
        let updated = repo.update(edited).await.unwrap();
        assert_eq!(updated.created_at, stored.created_at);
    }

    #[tokio::test]
    async fn unknown_ids() {
        let repo = MemoryPropertyRepository::new();

        assert!(matches!(repo.get(12).await, Err(StorageError::RecordNotFound)));
        assert!(matches!(repo.delete(12).await, Err(StorageError::RecordNotFound)));

        let mut ghost = applegate();
        ghost.id = 12;
        ghost.version = 1;
        assert!(matches!(repo.update(ghost.clone()).await, Err(StorageError::EditConflict)));

        ghost.id = 0;
        assert!(matches!(repo.update(ghost).await, Err(StorageError::RecordNotFound)));
        for id in [0, -4] {
            assert!(matches!(repo.get(id).await, Err(StorageError::RecordNotFound)));
            assert!(matches!(repo.delete(id).await, Err(StorageError::RecordNotFound)));
        }
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let repo = MemoryPropertyRepository::new();
        let stored = repo.insert(applegate()).await.unwrap();

        repo.delete(stored.id).await.unwrap();
        assert!(repo.is_empty().await);
        assert!(matches!(repo.get(stored.id).await, Err(StorageError::RecordNotFound)));
        assert!(matches!(repo.update(stored).await, Err(StorageError::EditConflict)));

        // Ids are never reused.
        let next = repo.insert(applegate()).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn exponent_floats_stay_floats() {
        let repo = MemoryPropertyRepository::new();
        let mut candidate = applegate();
        candidate.features.insert("Area", 1e16);
        candidate.features.insert("Debt", -2.5e18);

        let stored = repo.insert(candidate.clone()).await.unwrap();
        let fetched = repo.get(stored.id).await.unwrap();
        assert_eq!(fetched.features, candidate.features);
        assert_eq!(fetched.features.get("Area"), Some(&Scalar::Float(1e16)));
    }

    #[tokio::test]
    async fn unencodable_attributes_are_rejected_before_storing() {
        let repo = MemoryPropertyRepository::new();
        let mut candidate = applegate();
        candidate.features.insert("Ratio", f64::INFINITY);

        assert!(matches!(
            repo.insert(candidate).await,
            Err(StorageError::EncodeError(_))
        ));
        assert!(repo.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_have_one_winner() {
        let repo = MemoryPropertyRepository::new();
        let stored = repo.insert(applegate()).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                let mut attempt = stored.clone();
                attempt.title = format!("Writer {i}");
                tokio::spawn(async move { repo.update(attempt).await })
            })
            .collect();

        let mut winners = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(updated) => {
                    assert_eq!(updated.version, 2);
                    winners += 1;
                }
                Err(StorageError::EditConflict) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!((winners, conflicts), (1, 7));
        assert_eq!(repo.get(stored.id).await.unwrap().version, 2);
    }
}
