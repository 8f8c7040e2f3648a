use std::fmt;

use super::KeySection;

/// Invalid schema configuration. Raised by `SchemaBuilder::compile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    MissingPartitionKey {
        entity_type: String,
    },
    IncludeWithoutKey {
        entity_type: String,
        label: String,
    },
    DuplicateSection {
        entity_type: String,
        section: KeySection,
    },
    DuplicateLabel {
        entity_type: String,
        section: KeySection,
        label: String,
    },
    InvalidLabel {
        entity_type: String,
        label: String,
    },
    MissingIndexPartitionKey {
        entity_type: String,
        index: String,
    },
    DuplicateEntity {
        entity_type: String,
    },
    UnregisteredRelation {
        entity_type: String,
        related_type: String,
    },
    DuplicateRelation {
        entity_type: String,
        related_type: String,
    },
    ReservedAttributes(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::MissingPartitionKey { entity_type } => {
                write!(f, "{} declares no partition key", entity_type)
            }
            SchemaError::IncludeWithoutKey { entity_type, label } => write!(
                f,
                "{}: include({}) is not preceded by a key declaration",
                entity_type, label
            ),
            SchemaError::DuplicateSection {
                entity_type,
                section,
            } => write!(f, "{} declares its {} twice", entity_type, section),
            SchemaError::DuplicateLabel {
                entity_type,
                section,
                label,
            } => write!(
                f,
                "{}: label {} appears twice in the {}",
                entity_type, label, section
            ),
            SchemaError::InvalidLabel { entity_type, label } => write!(
                f,
                "{}: key label {:?} is empty or contains the delimiter",
                entity_type, label
            ),
            SchemaError::MissingIndexPartitionKey { entity_type, index } => write!(
                f,
                "{}: index {} has a sort key but no partition key",
                entity_type, index
            ),
            SchemaError::DuplicateEntity { entity_type } => {
                write!(f, "entity type {} is registered twice", entity_type)
            }
            SchemaError::UnregisteredRelation {
                entity_type,
                related_type,
            } => write!(
                f,
                "{} relates to {}, which is not registered",
                entity_type, related_type
            ),
            SchemaError::DuplicateRelation {
                entity_type,
                related_type,
            } => write!(
                f,
                "{} declares more than one relationship to {}",
                entity_type, related_type
            ),
            SchemaError::ReservedAttributes(message) => {
                write!(f, "reserved attribute names: {}", message)
            }
        }
    }
}

impl std::error::Error for SchemaError {}
