use std::fmt;

use crate::document::MaterializeError;
use crate::key::KeyError;
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Errors surfaced by the mapper to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperError {
    /// Invalid schema configuration, reported by `SchemaBuilder::compile`.
    Configuration(SchemaError),
    /// A key could not be built or parsed.
    KeyResolution(KeyError),
    /// An item could not be turned into an object, or an object into an item.
    Materialization(MaterializeError),
    /// An optimistic-lock precondition failed; nothing from the unit of work was applied.
    ConcurrencyConflict {
        entity_type: String,
        partition_key: String,
        sort_key: String,
    },
    /// Failure reported by the store client, passed through as-is.
    Transport(String),
    /// The entity type was never registered with the schema.
    UnknownEntity(String),
    /// The key does not belong to an entity tracked by this session.
    NotTracked(String),
    /// An entity with the same key is already tracked by this session.
    AlreadyTracked(String),
}

impl fmt::Display for MapperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperError::Configuration(err) => write!(f, "configuration error: {}", err),
            MapperError::KeyResolution(err) => write!(f, "key resolution error: {}", err),
            MapperError::Materialization(err) => write!(f, "materialization error: {}", err),
            MapperError::ConcurrencyConflict {
                entity_type,
                partition_key,
                sort_key,
            } => write!(
                f,
                "concurrency conflict on {} ({} / {})",
                entity_type, partition_key, sort_key
            ),
            MapperError::Transport(message) => write!(f, "store error: {}", message),
            MapperError::UnknownEntity(name) => {
                write!(f, "entity type {} is not registered", name)
            }
            MapperError::NotTracked(key) => write!(f, "entity {} is not tracked", key),
            MapperError::AlreadyTracked(key) => write!(f, "entity {} is already tracked", key),
        }
    }
}

impl std::error::Error for MapperError {}

impl From<SchemaError> for MapperError {
    fn from(err: SchemaError) -> Self {
        MapperError::Configuration(err)
    }
}

impl From<KeyError> for MapperError {
    fn from(err: KeyError) -> Self {
        MapperError::KeyResolution(err)
    }
}

impl From<MaterializeError> for MapperError {
    fn from(err: MaterializeError) -> Self {
        MapperError::Materialization(err)
    }
}

impl From<StoreError> for MapperError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transport(message) => MapperError::Transport(message),
            other => MapperError::Transport(other.to_string()),
        }
    }
}
