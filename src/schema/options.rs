use serde::{Deserialize, Serialize};

/// Physical layout of the table.
///
/// Every field has a default, so a partial JSON object is enough:
///
/// ```ignore
/// let options: TableOptions = serde_json::from_str(r#"{ "table_name": "movies" }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub table_name: String,
    pub partition_key_attribute: String,
    pub sort_key_attribute: String,
    /// Discriminator holding the entity type of each item.
    pub type_attribute: String,
    /// Optimistic-lock counter on versioned entity types.
    pub version_attribute: String,
    /// Marks relationship items and holds their relation kind.
    pub relation_attribute: String,
    /// Entity type that owns a relationship item.
    pub owner_attribute: String,
    pub delimiter: char,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            table_name: "app".to_string(),
            partition_key_attribute: "PK".to_string(),
            sort_key_attribute: "SK".to_string(),
            type_attribute: "__type".to_string(),
            version_attribute: "__version".to_string(),
            relation_attribute: "__rel".to_string(),
            owner_attribute: "__owner".to_string(),
            delimiter: '#',
        }
    }
}

impl TableOptions {
    pub fn index_partition_attribute(&self, index: &str) -> String {
        format!("{}{}", index, self.partition_key_attribute)
    }

    pub fn index_sort_attribute(&self, index: &str) -> String {
        format!("{}{}", index, self.sort_key_attribute)
    }

    /// Attribute names that are never part of a modeled entity.
    pub fn reserved_attributes(&self) -> Vec<String> {
        vec![
            self.partition_key_attribute.clone(),
            self.sort_key_attribute.clone(),
            self.type_attribute.clone(),
            self.version_attribute.clone(),
            self.relation_attribute.clone(),
            self.owner_attribute.clone(),
        ]
    }
}
