//! Storable trait for database-agnostic storage operations.
//!
//! Types implementing `Storable` describe the table they live in and hand
//! their writable columns to a backend as bindable [`Value`]s.

use crate::{ColumnType, StorageError, Value};

/// Trait for types that can be stored in a database.
///
/// # Column Naming
///
/// Database columns use snake_case. The serde name of a field may differ
/// (e.g. `Property::kind` is `type` both in JSON and in the table).
pub trait Storable: Clone + Send + Sync {
    /// The database table name for this type.
    fn table_name() -> &'static str;

    /// Column names in order (snake_case for DB).
    fn columns() -> &'static [&'static str];

    /// Column types in order, 1:1 with `columns()`.
    /// Used by executors to render reads of serialized columns and to bind typed nulls.
    fn column_types() -> &'static [ColumnType];

    /// Number of columns.
    fn column_count() -> usize {
        Self::columns().len()
    }

    /// Type of a named column, if the column exists.
    fn column_type(column: &str) -> Option<ColumnType> {
        Self::columns()
            .iter()
            .position(|c| *c == column)
            .and_then(|idx| Self::column_types().get(idx).copied())
    }

    /// Values of every caller-writable column, in column order.
    ///
    /// Store-managed columns (identity, timestamps, version) are omitted.
    fn writable_values(&self) -> Result<Vec<(&'static str, Value)>, StorageError>;
}
