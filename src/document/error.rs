use std::fmt;

use crate::value::CodecError;

/// Why an item could not be converted.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterializeErrorKind {
    /// The entity did not serialize to a map of attributes.
    NotAnObject,
    /// A modeled attribute uses a name the table reserves for keys or bookkeeping.
    ReservedAttribute(String),
    /// A stored value could not be decoded.
    Codec { attribute: String, source: CodecError },
    /// The decoded attributes did not fit the target type.
    Decode(String),
    /// Serializing the entity failed.
    Encode(String),
}

/// Failure to materialize a single item.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeError {
    pub entity_type: String,
    /// `PK / SK` of the offending item, when known.
    pub item: Option<String>,
    pub kind: MaterializeErrorKind,
}

impl MaterializeError {
    pub fn new(entity_type: impl Into<String>, kind: MaterializeErrorKind) -> Self {
        Self {
            entity_type: entity_type.into(),
            item: None,
            kind,
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }
}

impl fmt::Display for MaterializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterializeErrorKind::NotAnObject => write!(f, "entity is not a map of attributes"),
            MaterializeErrorKind::ReservedAttribute(name) => {
                write!(f, "attribute {} collides with a reserved attribute", name)
            }
            MaterializeErrorKind::Codec { attribute, source } => {
                write!(f, "attribute {}: {}", attribute, source)
            }
            MaterializeErrorKind::Decode(message) => write!(f, "decode failed: {}", message),
            MaterializeErrorKind::Encode(message) => write!(f, "encode failed: {}", message),
        }
    }
}

impl fmt::Display for MaterializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.item {
            Some(item) => write!(f, "{} item {}: {}", self.entity_type, item, self.kind),
            None => write!(f, "{}: {}", self.entity_type, self.kind),
        }
    }
}

impl std::error::Error for MaterializeError {}
