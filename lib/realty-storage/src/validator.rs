//! Field-level rule accumulation.
//!
//! A [`Validator`] collects one message per failing field. The resulting map is
//! handed back to clients verbatim, so messages are written for end users.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use crate::StorageError;

/// Field name → first failure message recorded for it.
pub type ValidationErrors = BTreeMap<String, String>;

#[derive(Debug, Default, Clone)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no rule has failed.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record `message` under `field` unless that field already failed.
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record `message` under `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    /// `Ok(())` when valid, otherwise [`StorageError::ValidationFailed`] carrying the map.
    pub fn into_result(self) -> Result<(), StorageError> {
        if self.valid() {
            Ok(())
        } else {
            Err(StorageError::ValidationFailed(self.errors))
        }
    }
}

/// True if every element of `values` is distinct.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|value| seen.insert(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_failures_only() {
        let mut v = Validator::new();
        v.check(true, "title", "must be provided");
        assert!(v.valid());

        v.check(false, "price", "must be greater than zero");
        assert!(!v.valid());
        assert_eq!(
            v.errors().get("price").map(String::as_str),
            Some("must be greater than zero")
        );
    }

    #[test]
    fn first_message_per_field_wins() {
        let mut v = Validator::new();
        v.check(false, "title", "must be provided");
        v.check(false, "title", "must not be more than 500 bytes long");

        let errors = v.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["title"], "must be provided");
    }

    #[test]
    fn into_result_carries_the_field_map() {
        let mut v = Validator::new();
        v.add_error("features", "must be provided");

        match v.into_result() {
            Err(StorageError::ValidationFailed(errors)) => {
                assert_eq!(errors["features"], "must be provided");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert!(Validator::new().into_result().is_ok());
    }

    #[test]
    fn unique_detects_duplicates() {
        assert!(unique::<String>(&[]));
        assert!(unique(&["Parking", "Pool"]));
        assert!(!unique(&["Parking", "Parking"]));
    }
}
