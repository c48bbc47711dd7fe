use std::time::Duration;

use thiserror::Error;

use crate::ValidationErrors;

/// Errors surfaced by validation, the attribute codec, and every store backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("record not found")]
    RecordNotFound,

    #[error("edit conflict")]
    EditConflict,

    #[error("failed validation: {0:?}")]
    ValidationFailed(ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Coarse classification of a [`StorageError`], as seen by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    EditConflict,
    ValidationFailed,
    BadRequest,
    ServerError,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::RecordNotFound => ErrorKind::NotFound,
            StorageError::EditConflict => ErrorKind::EditConflict,
            StorageError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            StorageError::BadRequest(_) => ErrorKind::BadRequest,
            StorageError::EncodeError(_)
            | StorageError::DecodeError(_)
            | StorageError::SerializationError(_)
            | StorageError::Timeout(_)
            | StorageError::StorageError(_) => ErrorKind::ServerError,
        }
    }

    /// HTTP status code the transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::EditConflict => 409,
            ErrorKind::ValidationFailed => 422,
            ErrorKind::BadRequest => 400,
            ErrorKind::ServerError => 500,
        }
    }
}
