//! Mapping between PostgreSQL rows and listings.
//!
//! Attribute columns are selected as text (see the executor's select list) and
//! run through the attribute codec; everything else decodes natively.

use realty_storage::{AttributeMap, Property, StorageDatetime, StorageError};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::postgres::PgRow;
use sqlx::{Decode, Postgres, Row, Type};

/// Columns the database assigns on insert.
pub const ASSIGNED_COLUMNS: [&str; 3] = ["id", "created_at", "version"];

/// Read one column, naming it in the error.
pub fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StorageError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StorageError::StorageError(format!("column {}: {}", name, e)))
}

/// Decode an attribute column. A NULL, a non-text column, or a malformed
/// document is a decode failure, never an empty map.
pub fn attributes<V>(row: &PgRow, name: &str) -> Result<AttributeMap<V>, StorageError>
where
    V: Serialize + DeserializeOwned,
{
    let raw: Option<String> = row
        .try_get(name)
        .map_err(|e| StorageError::DecodeError(format!("column {}: {}", name, e)))?;
    let raw = raw.ok_or_else(|| StorageError::DecodeError(format!("column {} is null", name)))?;
    AttributeMap::decode(raw.as_bytes())
}

fn tokens(row: &PgRow, name: &str) -> Result<Vec<String>, StorageError> {
    Ok(column::<Option<Vec<String>>>(row, name)?.unwrap_or_default())
}

fn created_at(row: &PgRow) -> Result<StorageDatetime, StorageError> {
    column::<chrono::DateTime<chrono::Utc>>(row, "created_at").map(StorageDatetime::from)
}

/// Build a listing from a full row.
pub fn property_from_row(row: &PgRow) -> Result<Property, StorageError> {
    Ok(Property {
        id: column(row, "id")?,
        created_at: Some(created_at(row)?),
        title: column(row, "title")?,
        description: column(row, "description")?,
        city: column(row, "city")?,
        location: column(row, "location")?,
        latitude: column(row, "latitude")?,
        longitude: column(row, "longitude")?,
        kind: tokens(row, "type")?,
        category: tokens(row, "category")?,
        features: attributes(row, "features")?,
        price: column(row, "price")?,
        currency: tokens(row, "currency")?,
        nearby: attributes(row, "nearby")?,
        amenities: tokens(row, "amenities")?,
        version: column(row, "version")?,
    })
}

/// Copy the store-assigned columns returned by an insert onto `property`.
pub fn apply_assigned(property: &mut Property, row: &PgRow) -> Result<(), StorageError> {
    property.id = column(row, "id")?;
    property.created_at = Some(created_at(row)?);
    property.version = column(row, "version")?;
    Ok(())
}
