use std::path::PathBuf;

use thiserror::Error;

use crate::world::types::RoomId;

/// Errors that can arise while loading, validating or persisting the world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Wrapper around IO errors (directory creation, directory walks).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON encoding and decoding errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A room, catalog or state file is missing or could not be decoded.
    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Room data is internally inconsistent.
    #[error("room {room_id} failed validation: {reason}")]
    Validation { room_id: RoomId, reason: String },

    /// Something points at an id that does not exist.
    #[error("unresolved reference: {0}")]
    Reference(String),

    /// Disk write or rename failure during an explicit save.
    #[error("failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Returned when fetching a record that is not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// A relative period string could not be parsed.
    #[error("invalid period: {0:?}")]
    InvalidPeriod(String),

    /// Zone name is malformed or already taken.
    #[error("invalid zone: {0}")]
    InvalidZone(String),
}

impl WorldError {
    pub(crate) fn validation(room_id: RoomId, reason: impl Into<String>) -> Self {
        WorldError::Validation {
            room_id,
            reason: reason.into(),
        }
    }

    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        WorldError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
