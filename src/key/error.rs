use std::fmt;

use crate::schema::KeySection;

/// Failure to build or parse a composite key. No partial key is ever returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A required key part resolved to nothing.
    MissingValue {
        entity_type: String,
        section: KeySection,
        label: String,
    },
    /// A raw key value contains the delimiter.
    DelimiterInValue {
        entity_type: String,
        label: String,
        value: String,
    },
    /// A stored key does not split into `LABEL#value` pairs.
    Malformed { key: String, reason: String },
    /// A stored key's labels differ from the declared ones.
    LabelMismatch {
        entity_type: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    UndeclaredSection {
        entity_type: String,
        section: KeySection,
    },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::MissingValue {
                entity_type,
                section,
                label,
            } => write!(
                f,
                "{}: {} part {} has no value",
                entity_type, section, label
            ),
            KeyError::DelimiterInValue {
                entity_type,
                label,
                value,
            } => write!(
                f,
                "{}: value {:?} for {} contains the key delimiter",
                entity_type, value, label
            ),
            KeyError::Malformed { key, reason } => write!(f, "malformed key {:?}: {}", key, reason),
            KeyError::LabelMismatch {
                entity_type,
                expected,
                found,
            } => write!(
                f,
                "{}: expected key labels {:?}, found {:?}",
                entity_type, expected, found
            ),
            KeyError::UndeclaredSection {
                entity_type,
                section,
            } => write!(f, "{} declares no {}", entity_type, section),
        }
    }
}

impl std::error::Error for KeyError {}
