//! Open-ended attribute maps stored as a single serialized column.
//!
//! Listings carry facts that do not deserve their own column (`{"Bedrooms": 3}`,
//! `{"Hospital": "7km"}`). They are kept in an [`AttributeMap`] and written to
//! storage as a JSON object via [`AttributeMap::encode`] / [`AttributeMap::decode`].

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::StorageError;

/// A scalar attribute value. Serialized as the bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Integer(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Integer(n.into())
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Float(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

/// String-keyed attribute map. Keys are unique; iteration is in key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap<V>(BTreeMap<String, V>);

/// Named facts about a listing, e.g. `{"Bedrooms": 3, "Furnished": true}`.
pub type Features = AttributeMap<Scalar>;

/// Facility name → free-text distance, e.g. `{"Hospital": "7km"}`.
pub type Nearby = AttributeMap<String>;

impl<V> AttributeMap<V> {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert or replace the value stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<V>) -> Option<V> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, V> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, V> {
        self.0
    }
}

impl<V: Serialize + DeserializeOwned> AttributeMap<V> {
    /// Serialize to the JSON object stored in the attribute column.
    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        let value =
            serde_json::to_value(&self.0).map_err(|e| StorageError::EncodeError(e.to_string()))?;

        // serde_json maps NaN and infinities to null, which would not survive a decode
        if let Some(obj) = value.as_object() {
            if let Some((key, _)) = obj.iter().find(|(_, v)| v.is_null()) {
                return Err(StorageError::EncodeError(format!(
                    "attribute {key} has no JSON representation"
                )));
            }
        }

        serde_json::to_vec(&value).map_err(|e| StorageError::EncodeError(e.to_string()))
    }

    /// Parse a stored attribute column. Anything other than a JSON object of
    /// the expected value type is rejected as a whole.
    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        serde_json::from_slice::<BTreeMap<String, V>>(bytes)
            .map(Self)
            .map_err(|e| StorageError::DecodeError(e.to_string()))
    }
}

impl<V> Default for AttributeMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> From<BTreeMap<String, V>> for AttributeMap<V> {
    fn from(map: BTreeMap<String, V>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for AttributeMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'a, V> IntoIterator for &'a AttributeMap<V> {
    type Item = (&'a String, &'a V);
    type IntoIter = btree_map::Iter<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
