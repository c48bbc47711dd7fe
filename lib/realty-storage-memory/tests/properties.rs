//! Listing operations driven through the `Properties` facade.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use realty_storage::{
    ErrorKind, Properties, PropertyInput, PropertyPatch, PropertyRepository, Scalar,
    StorageError, envelope, error_envelope, parse_id,
};
use realty_storage_memory::MemoryPropertyRepository;
use serde_json::json;

const CREATE_BODY: &[u8] = br#"{
    "title": "6007 Applegate Lane",
    "description": "Two storey family house",
    "city": "Louisville",
    "location": "Applegate Lane",
    "latitude": 38.2527,
    "type": ["Duplex"],
    "category": ["Sale"],
    "features": {"Bedrooms": 1, "Furnished": true, "Plot": 450.5, "Heating": "Gas"},
    "price": 200000,
    "currency": ["USD"],
    "nearby": {"Hospital": "7km"},
    "amenities": ["Parking", "Garden"]
}"#;

fn service() -> Properties<MemoryPropertyRepository> {
    Properties::new(MemoryPropertyRepository::new())
}

#[tokio::test]
async fn create_show_edit_remove() {
    let properties = service();

    let input = PropertyInput::from_json(CREATE_BODY).unwrap();
    let created = properties.create(input).await.unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(created.version, 1);
    assert_eq!(created.features.get("Heating"), Some(&Scalar::from("Gas")));

    let id = parse_id(&created.id.to_string()).unwrap();
    let shown = properties.show(id).await.unwrap();
    assert_eq!(shown, created);

    let patch = PropertyPatch::from_json(br#"{"price": 185000, "longitude": -85.7585}"#).unwrap();
    let edited = properties.edit(id, patch).await.unwrap();
    assert_eq!(edited.version, 2);
    assert_eq!(edited.price, 185000.0);
    assert_eq!(edited.longitude, Some(-85.7585));
    assert_eq!(edited.title, created.title);
    assert_eq!(edited.features, created.features);

    properties.remove(id).await.unwrap();
    let gone = properties.show(id).await.unwrap_err();
    assert_eq!(gone.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn invalid_listing_is_never_stored() {
    let properties = service();
    let input = PropertyInput::from_json(br#"{"title": "", "price": 0, "amenities": ["a", "a"]}"#)
        .unwrap();

    let err = properties.create(input).await.unwrap_err();
    let StorageError::ValidationFailed(errors) = &err else {
        panic!("expected validation failure, got {err:?}");
    };
    assert_eq!(errors.get("title").map(String::as_str), Some("must be provided"));
    assert_eq!(errors.get("price").map(String::as_str), Some("must be greater than zero"));
    assert_eq!(
        errors.get("amenities").map(String::as_str),
        Some("must not contain duplicate values")
    );
    assert!(properties.repository().is_empty().await);

    let (status, body) = error_envelope(&err);
    assert_eq!(status, 422);
    assert_eq!(body["error"]["price"], json!("must be greater than zero"));
}

#[tokio::test]
async fn edit_that_breaks_a_rule_leaves_the_row_alone() {
    let properties = service();
    let created = properties
        .create(PropertyInput::from_json(CREATE_BODY).unwrap())
        .await
        .unwrap();

    let patch = PropertyPatch {
        currency: Some(vec!["USD".to_string(), "EUR".to_string()]),
        ..Default::default()
    };
    let err = properties.edit(created.id, patch).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let stored = properties.show(created.id).await.unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.currency, vec!["USD".to_string()]);
}

#[tokio::test]
async fn edit_of_unknown_listing_is_not_found() {
    let properties = service();

    let err = properties
        .edit(31, PropertyPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::RecordNotFound));

    let (status, body) = error_envelope(&err);
    assert_eq!(status, 404);
    assert_eq!(body["error"], json!("the requested resource could not be found"));
}

#[tokio::test]
async fn edit_loses_to_a_write_it_did_not_see() {
    let properties = service();
    let created = properties
        .create(PropertyInput::from_json(CREATE_BODY).unwrap())
        .await
        .unwrap();

    // Another writer lands first from the same starting version.
    let mut other = created.clone();
    other.title = "Sold".to_string();
    properties.repository().update(other).await.unwrap();

    // A stale full-record write now conflicts.
    let err = properties.repository().update(created).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EditConflict);
    let (status, body) = error_envelope(&err);
    assert_eq!(status, 409);
    assert_eq!(
        body["error"],
        json!("unable to update the record due to an edit conflict. Please try again")
    );
}

#[tokio::test]
async fn bad_ids_and_bodies() {
    let properties = service();

    for raw in ["0", "-3", "abc", ""] {
        assert!(matches!(parse_id(raw), Err(StorageError::RecordNotFound)));
    }
    assert!(matches!(properties.remove(0).await, Err(StorageError::RecordNotFound)));

    let err = PropertyInput::from_json(b"{\"title\": 5}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(error_envelope(&err).0, 400);
}

#[tokio::test]
async fn success_envelopes() {
    let properties = service();
    let created = properties
        .create(PropertyInput::from_json(CREATE_BODY).unwrap())
        .await
        .unwrap();

    let body = envelope("property", &created).unwrap();
    assert_eq!(body["property"]["id"], json!(1));
    assert_eq!(body["property"]["type"], json!(["Duplex"]));
    assert_eq!(body["property"]["nearby"], json!({"Hospital": "7km"}));

    properties.remove(created.id).await.unwrap();
    let body = envelope("message", "property successfully deleted").unwrap();
    assert_eq!(body["message"], json!("property successfully deleted"));
}
