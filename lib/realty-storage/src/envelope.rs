//! JSON bodies handed to the transport layer.
//!
//! Successful results are wrapped under a named top-level key
//! (`{"property": {...}}`); failures always use `{"error": ...}`.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::{ErrorKind, StorageError};

pub type Envelope = Map<String, JsonValue>;

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";
const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
const EDIT_CONFLICT_MESSAGE: &str =
    "unable to update the record due to an edit conflict. Please try again";

/// Wrap `value` under `name`.
pub fn envelope(name: &str, value: impl Serialize) -> Result<Envelope, StorageError> {
    let mut env = Envelope::new();
    env.insert(name.to_string(), serde_json::to_value(value)?);
    Ok(env)
}

/// Status code and `{"error": ...}` body for a failed operation.
///
/// Server-class failures never leak their detail to clients; validation
/// failures carry the field map.
pub fn error_envelope(err: &StorageError) -> (u16, Envelope) {
    let message = match (err.kind(), err) {
        (ErrorKind::ValidationFailed, StorageError::ValidationFailed(errors)) => JsonValue::Object(
            errors
                .iter()
                .map(|(field, message)| (field.clone(), JsonValue::String(message.clone())))
                .collect(),
        ),
        (ErrorKind::BadRequest, StorageError::BadRequest(detail)) => {
            JsonValue::String(detail.clone())
        }
        (ErrorKind::NotFound, _) => JsonValue::String(NOT_FOUND_MESSAGE.to_string()),
        (ErrorKind::EditConflict, _) => JsonValue::String(EDIT_CONFLICT_MESSAGE.to_string()),
        _ => JsonValue::String(SERVER_ERROR_MESSAGE.to_string()),
    };

    let mut env = Envelope::new();
    env.insert("error".to_string(), message);
    (err.status_code(), env)
}
