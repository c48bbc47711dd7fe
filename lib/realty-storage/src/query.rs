//! Database-agnostic statement builders.
//!
//! This module describes single-statement reads and writes that a backend
//! renders into its own dialect. Every builder targets one table and combines
//! its filters with AND.

use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};

use crate::{AttributeMap, Storable, StorageError};

/// Storage-level type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    BigInt,
    Integer,
    Double,
    Boolean,
    TextArray,
    /// A serialized document (attribute maps).
    Json,
    Datetime,
}

/// A value that can be bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Strings(Vec<String>),
    /// Serialized JSON document, bound as text and cast by the backend.
    Json(String),
    /// NULL of the given column type.
    Null(ColumnType),
}

impl Value {
    /// Encode an attribute map into a bindable JSON document.
    pub fn attributes<V: Serialize + DeserializeOwned>(
        map: &AttributeMap<V>,
    ) -> Result<Self, StorageError> {
        let bytes = map.encode()?;
        String::from_utf8(bytes)
            .map(Value::Json)
            .map_err(|e| StorageError::EncodeError(e.to_string()))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        match n {
            Some(n) => Value::Float(n),
            None => Value::Null(ColumnType::Double),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Strings(v)
    }
}

impl From<&[String]> for Value {
    fn from(v: &[String]) -> Self {
        Value::Strings(v.to_vec())
    }
}

impl From<&Vec<String>> for Value {
    fn from(v: &Vec<String>) -> Self {
        Value::Strings(v.clone())
    }
}

/// Filter conditions for queries.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// field = value
    Eq(String, Value),
}

/// Right-hand side of a SET clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// column = bound value
    Value(Value),
    /// column = expression, rendered verbatim (e.g. `version + 1`)
    Raw(String),
}

/// A SELECT query builder.
#[derive(Debug, Clone)]
pub struct Query<T> {
    /// The table to query.
    pub table: String,
    /// Filter conditions.
    pub filters: Vec<Filter>,
    /// Maximum number of results.
    pub limit: Option<u64>,
    pub(crate) _marker: PhantomData<T>,
}

impl<T: Storable> Query<T> {
    /// Create a new query for the type's table.
    pub fn new() -> Self {
        Self::for_table(T::table_name())
    }

    /// Create a new query with an explicit table name.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            limit: None,
            _marker: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an equality filter (shorthand for Filter::Eq).
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(field.into(), value.into()))
    }

    /// Set the maximum number of results.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl<T: Storable> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An INSERT builder.
#[derive(Debug, Clone)]
pub struct Insert<T> {
    pub table: String,
    /// Columns and the values bound to them, in order.
    pub values: Vec<(String, Value)>,
    /// Columns to hand back from the inserted row.
    pub returning: Vec<String>,
    pub(crate) _marker: PhantomData<T>,
}

impl<T: Storable> Insert<T> {
    pub fn new() -> Self {
        Self::for_table(T::table_name())
    }

    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
            returning: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Insert every writable column of `item`.
    pub fn from_item(item: &T) -> Result<Self, StorageError> {
        Ok(item
            .writable_values()?
            .into_iter()
            .fold(Self::new(), |insert, (column, value)| {
                insert.value(column, value)
            }))
    }

    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }
}

impl<T: Storable> Default for Insert<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An UPDATE builder. Without filters it would touch every row, so backends
/// refuse to run one that has none.
#[derive(Debug, Clone)]
pub struct Update<T> {
    pub table: String,
    pub assignments: Vec<(String, Assignment)>,
    pub filters: Vec<Filter>,
    pub returning: Vec<String>,
    pub(crate) _marker: PhantomData<T>,
}

impl<T: Storable> Update<T> {
    pub fn new() -> Self {
        Self::for_table(T::table_name())
    }

    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            filters: Vec::new(),
            returning: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Set every writable column of `item`.
    pub fn from_item(item: &T) -> Result<Self, StorageError> {
        Ok(item
            .writable_values()?
            .into_iter()
            .fold(Self::new(), |update, (column, value)| {
                update.set(column, value)
            }))
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments
            .push((column.into(), Assignment::Value(value.into())));
        self
    }

    /// Assign an expression evaluated by the database, e.g. `version + 1`.
    pub fn set_raw(mut self, column: impl Into<String>, expression: impl Into<String>) -> Self {
        self.assignments
            .push((column.into(), Assignment::Raw(expression.into())));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(field.into(), value.into()))
    }

    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }
}

impl<T: Storable> Default for Update<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A DELETE query builder.
#[derive(Debug, Clone)]
pub struct Delete<T> {
    /// The table to delete from.
    pub table: String,
    /// Filter conditions.
    pub filters: Vec<Filter>,
    pub(crate) _marker: PhantomData<T>,
}

impl<T: Storable> Delete<T> {
    /// Create a new delete query for the type's table.
    pub fn new() -> Self {
        Self::for_table(T::table_name())
    }

    /// Create a new delete query with an explicit table name.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an equality filter (shorthand).
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(field.into(), value.into()))
    }
}

impl<T: Storable> Default for Delete<T> {
    fn default() -> Self {
        Self::new()
    }
}
