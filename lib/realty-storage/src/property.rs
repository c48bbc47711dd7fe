//! The listing entity, its invariants, and the shapes untrusted input arrives in.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    AttributeMap, ColumnType, Features, Nearby, Storable, StorageDatetime, StorageError,
    Validator, Value, unique,
};

pub const MAX_TITLE_BYTES: usize = 500;
pub const MAX_FEATURES: usize = 20;
pub const MAX_NEARBY: usize = 10;
/// `type`, `category` and `currency` hold at most this many tokens.
pub const MAX_TOKENS: usize = 1;

/// A real-estate listing.
///
/// `id`, `created_at` and `version` belong to the store: they are assigned on
/// insert and only ever changed by it. An unsaved property has `id == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub id: i64,
    #[serde(skip)]
    pub created_at: Option<StorageDatetime>,
    pub title: String,
    pub description: String,
    pub city: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub kind: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub features: Features,
    pub price: f64,
    #[serde(default)]
    pub currency: Vec<String>,
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub nearby: Nearby,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub version: i32,
}

impl Property {
    /// Run every invariant check, recording failures in `v`.
    pub fn validate(&self, v: &mut Validator) {
        v.check(!self.title.is_empty(), "title", "must be provided");
        v.check(
            self.title.len() <= MAX_TITLE_BYTES,
            "title",
            "must not be more than 500 bytes long",
        );

        v.check(!self.description.is_empty(), "description", "must be provided");
        v.check(!self.city.is_empty(), "city", "must be provided");
        v.check(!self.location.is_empty(), "location", "must be provided");

        // Token contents are not checked, only their count.
        for (field, tokens) in [
            ("type", &self.kind),
            ("category", &self.category),
            ("currency", &self.currency),
        ] {
            v.check(
                tokens.len() <= MAX_TOKENS,
                field,
                "must not contain more than 1 entry",
            );
        }

        v.check(!self.features.is_empty(), "features", "must be provided");
        v.check(
            self.features.len() <= MAX_FEATURES,
            "features",
            "must not contain more than 20 entries",
        );

        v.check(!self.nearby.is_empty(), "nearby", "must be provided");
        v.check(
            self.nearby.len() <= MAX_NEARBY,
            "nearby",
            "must not contain more than 10 entries",
        );

        v.check(self.price > 0.0, "price", "must be greater than zero");

        v.check(
            unique(&self.amenities),
            "amenities",
            "must not contain duplicate values",
        );
    }

    /// Validate with a fresh [`Validator`], failing with [`StorageError::ValidationFailed`].
    pub fn check(&self) -> Result<(), StorageError> {
        let mut v = Validator::new();
        self.validate(&mut v);
        v.into_result()
    }

    /// True once the store has assigned an identity.
    pub fn is_persisted(&self) -> bool {
        self.id >= 1
    }
}

impl Storable for Property {
    fn table_name() -> &'static str {
        "properties"
    }

    fn columns() -> &'static [&'static str] {
        &[
            "id",
            "created_at",
            "title",
            "description",
            "city",
            "location",
            "latitude",
            "longitude",
            "type",
            "category",
            "features",
            "price",
            "currency",
            "nearby",
            "amenities",
            "version",
        ]
    }

    fn column_types() -> &'static [ColumnType] {
        &[
            ColumnType::BigInt,
            ColumnType::Datetime,
            ColumnType::Text,
            ColumnType::Text,
            ColumnType::Text,
            ColumnType::Text,
            ColumnType::Double,
            ColumnType::Double,
            ColumnType::TextArray,
            ColumnType::TextArray,
            ColumnType::Json,
            ColumnType::Double,
            ColumnType::TextArray,
            ColumnType::Json,
            ColumnType::TextArray,
            ColumnType::Integer,
        ]
    }

    fn writable_values(&self) -> Result<Vec<(&'static str, Value)>, StorageError> {
        Ok(vec![
            ("title", Value::from(&self.title)),
            ("description", Value::from(&self.description)),
            ("city", Value::from(&self.city)),
            ("location", Value::from(&self.location)),
            ("latitude", Value::from(self.latitude)),
            ("longitude", Value::from(self.longitude)),
            ("type", Value::from(&self.kind)),
            ("category", Value::from(&self.category)),
            ("features", Value::attributes(&self.features)?),
            ("price", Value::from(self.price)),
            ("currency", Value::from(&self.currency)),
            ("nearby", Value::attributes(&self.nearby)?),
            ("amenities", Value::from(&self.amenities)),
        ])
    }
}

/// Create payload: every caller-settable field, none of the store-managed ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<Vec<String>>,
    #[serde(default)]
    pub features: Option<Features>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub currency: Option<Vec<String>>,
    #[serde(default)]
    pub nearby: Option<Nearby>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
}

impl PropertyInput {
    /// Decode a request body, reporting malformed JSON as [`StorageError::BadRequest`].
    pub fn from_json(body: &[u8]) -> Result<Self, StorageError> {
        read_json(body)
    }

    /// Build an unsaved property. Missing collections become empty.
    pub fn into_property(self) -> Property {
        Property {
            id: 0,
            created_at: None,
            title: self.title,
            description: self.description,
            city: self.city,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            kind: self.kind.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            features: self.features.unwrap_or_default(),
            price: self.price,
            currency: self.currency.unwrap_or_default(),
            nearby: self.nearby.unwrap_or_default(),
            amenities: self.amenities.unwrap_or_default(),
            version: 0,
        }
    }
}

/// Partial update payload. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<Vec<String>>,
    #[serde(default)]
    pub features: Option<Features>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<Vec<String>>,
    #[serde(default)]
    pub nearby: Option<Nearby>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
}

impl PropertyPatch {
    pub fn from_json(body: &[u8]) -> Result<Self, StorageError> {
        read_json(body)
    }

    /// Copy the supplied fields onto `property`. The result must be validated
    /// again before it is written back.
    pub fn apply_to(self, property: &mut Property) {
        if let Some(title) = self.title {
            property.title = title;
        }
        if let Some(description) = self.description {
            property.description = description;
        }
        if let Some(city) = self.city {
            property.city = city;
        }
        if let Some(location) = self.location {
            property.location = location;
        }
        if let Some(latitude) = self.latitude {
            property.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            property.longitude = Some(longitude);
        }
        if let Some(kind) = self.kind {
            property.kind = kind;
        }
        if let Some(category) = self.category {
            property.category = category;
        }
        if let Some(features) = self.features {
            property.features = features;
        }
        if let Some(price) = self.price {
            property.price = price;
        }
        if let Some(currency) = self.currency {
            property.currency = currency;
        }
        if let Some(nearby) = self.nearby {
            property.nearby = nearby;
        }
        if let Some(amenities) = self.amenities {
            property.amenities = amenities;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse an `:id` path segment. Anything but a positive integer is reported as
/// [`StorageError::RecordNotFound`], the same answer a missing row gets.
pub fn parse_id(raw: &str) -> Result<i64, StorageError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(StorageError::RecordNotFound),
    }
}

fn read_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, StorageError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(StorageError::BadRequest("body must not be empty".to_string()));
    }
    serde_json::from_slice(body).map_err(|e| StorageError::BadRequest(e.to_string()))
}
