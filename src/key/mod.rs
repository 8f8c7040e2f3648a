//! Composite key encoding and relationship item layout.
//!
//! A composite key is the declared key parts rendered as `LABEL#value`
//! segments joined by the table delimiter, in declaration order. Values are
//! stringified by the table's value codec and must not contain the delimiter.

mod composite;
mod error;
mod items;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::schema::{KeyPart, KeySection, TableOptions, TableSchema};

pub use composite::CompositeKey;
pub use error::KeyError;
pub use items::RelationItem;
pub(crate) use items::{relation_items, root_item};

/// Physical primary key of one item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl ItemKey {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Read the key attributes of a stored item.
    pub fn from_document(options: &TableOptions, document: &Document) -> Option<Self> {
        let partition_key = document.get(&options.partition_key_attribute)?.as_s()?;
        let sort_key = document.get(&options.sort_key_attribute)?.as_s()?;
        Some(Self::new(partition_key, sort_key))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.partition_key, self.sort_key)
    }
}

/// Sort key of a relationship item in its owner's partition. Owners that
/// declare a sort key share the partition with their siblings, so the
/// owner's sort key prefixes the related identity.
pub(crate) fn scoped_sort_key(
    delimiter: char,
    owner_sort_key: Option<&str>,
    identity: &str,
) -> String {
    match owner_sort_key {
        Some(owner) => format!("{}{}{}", owner, delimiter, identity),
        None => identity.to_string(),
    }
}

/// Whether a relationship item sort key lies under `owner_sort_key`.
pub(crate) fn in_scope(
    delimiter: char,
    owner_sort_key: Option<&str>,
    sort_key: &str,
) -> bool {
    match owner_sort_key {
        Some(owner) => sort_key
            .strip_prefix(owner)
            .map_or(false, |rest| rest.starts_with(delimiter)),
        None => true,
    }
}

/// Render `parts` of `entity` as a composite key.
pub(crate) fn compose<E>(
    schema: &TableSchema,
    entity_type: &str,
    section: &KeySection,
    parts: &[KeyPart<E>],
    entity: &E,
) -> Result<String, KeyError> {
    let delimiter = schema.options().delimiter;
    let mut key = String::new();

    for part in parts {
        let scalar = part.resolve(entity).ok_or_else(|| KeyError::MissingValue {
            entity_type: entity_type.to_string(),
            section: section.clone(),
            label: part.label().to_string(),
        })?;

        let value = schema.codec().key_string(&scalar);
        if value.contains(delimiter) {
            return Err(KeyError::DelimiterInValue {
                entity_type: entity_type.to_string(),
                label: part.label().to_string(),
                value,
            });
        }

        if !key.is_empty() {
            key.push(delimiter);
        }
        key.push_str(part.label());
        key.push(delimiter);
        key.push_str(&value);
    }

    Ok(key)
}
