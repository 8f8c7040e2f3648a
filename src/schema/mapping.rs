use std::any::{Any, TypeId};

use super::{IndexKeys, KeyPart, KeySection, Relationship, TableSchema};
use crate::document::Document;
use crate::entity::Entity;
use crate::error::MapperError;
use crate::key::{self, CompositeKey, ItemKey, KeyError};

/// Compiled key and relationship layout of one entity type.
pub struct EntityMapping<E> {
    pub(crate) partition: Vec<KeyPart<E>>,
    pub(crate) sort: Vec<KeyPart<E>>,
    pub(crate) indexes: Vec<IndexKeys<E>>,
    pub(crate) relationships: Vec<Relationship<E>>,
    pub(crate) versioned: bool,
}

impl<E: Entity> EntityMapping<E> {
    pub fn entity_type(&self) -> &'static str {
        E::ENTITY_TYPE
    }

    pub fn partition_parts(&self) -> &[KeyPart<E>] {
        &self.partition
    }

    pub fn sort_parts(&self) -> &[KeyPart<E>] {
        &self.sort
    }

    pub fn indexes(&self) -> &[IndexKeys<E>] {
        &self.indexes
    }

    pub fn relationships(&self) -> &[Relationship<E>] {
        &self.relationships
    }

    pub fn relationship(&self, related_type: &str) -> Option<&Relationship<E>> {
        self.relationships
            .iter()
            .find(|relation| relation.related_type() == related_type)
    }

    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    /// Key parts composing `section`. A missing sort key falls back to the
    /// partition key parts, matching how root items are written.
    pub fn parts(&self, section: &KeySection) -> Option<&[KeyPart<E>]> {
        match section {
            KeySection::Partition => Some(&self.partition),
            KeySection::Sort if self.sort.is_empty() => Some(&self.partition),
            KeySection::Sort => Some(&self.sort),
            KeySection::IndexPartition(name) => self
                .indexes
                .iter()
                .find(|index| &index.name == name)
                .map(|index| index.partition.as_slice()),
            KeySection::IndexSort(name) => self
                .indexes
                .iter()
                .find(|index| &index.name == name && !index.sort.is_empty())
                .map(|index| index.sort.as_slice()),
        }
    }

    pub fn partition_key(&self, schema: &TableSchema, entity: &E) -> Result<String, KeyError> {
        key::compose(schema, E::ENTITY_TYPE, &KeySection::Partition, &self.partition, entity)
    }

    pub fn sort_key(&self, schema: &TableSchema, entity: &E) -> Result<String, KeyError> {
        if self.sort.is_empty() {
            return self.partition_key(schema, entity);
        }
        key::compose(schema, E::ENTITY_TYPE, &KeySection::Sort, &self.sort, entity)
    }

    /// Key identifying the entity inside another entity's partition.
    pub fn identity(&self, schema: &TableSchema, entity: &E) -> Result<String, KeyError> {
        let partition_key = self.partition_key(schema, entity)?;
        if self.sort.is_empty() {
            return Ok(partition_key);
        }
        let sort_key = self.sort_key(schema, entity)?;
        Ok(format!(
            "{}{}{}",
            partition_key,
            schema.options().delimiter,
            sort_key
        ))
    }

    /// The owner's sort key when relationship items in its partition must be
    /// told apart from a sibling's, `None` when the entity has the partition
    /// to itself.
    pub fn relation_scope(
        &self,
        schema: &TableSchema,
        entity: &E,
    ) -> Result<Option<String>, KeyError> {
        if self.sort.is_empty() {
            return Ok(None);
        }
        self.sort_key(schema, entity).map(Some)
    }

    pub fn item_key(&self, schema: &TableSchema, entity: &E) -> Result<ItemKey, KeyError> {
        Ok(ItemKey::new(
            self.partition_key(schema, entity)?,
            self.sort_key(schema, entity)?,
        ))
    }

    /// `(attribute, value)` pairs for every declared secondary index.
    pub fn index_attributes(
        &self,
        schema: &TableSchema,
        entity: &E,
    ) -> Result<Vec<(String, String)>, KeyError> {
        let options = schema.options();
        let mut attributes = Vec::new();
        for index in &self.indexes {
            let section = KeySection::IndexPartition(index.name.clone());
            attributes.push((
                options.index_partition_attribute(&index.name),
                key::compose(schema, E::ENTITY_TYPE, &section, &index.partition, entity)?,
            ));
            if !index.sort.is_empty() {
                let section = KeySection::IndexSort(index.name.clone());
                attributes.push((
                    options.index_sort_attribute(&index.name),
                    key::compose(schema, E::ENTITY_TYPE, &section, &index.sort, entity)?,
                ));
            }
        }
        Ok(attributes)
    }

    /// Parse a stored key and check its labels against this mapping.
    pub fn decode_key(
        &self,
        schema: &TableSchema,
        section: &KeySection,
        raw: &str,
    ) -> Result<CompositeKey, KeyError> {
        let parts = self
            .parts(section)
            .ok_or_else(|| KeyError::UndeclaredSection {
                entity_type: E::ENTITY_TYPE.to_string(),
                section: section.clone(),
            })?;
        let decoded = CompositeKey::parse(raw, schema.options().delimiter)?;
        let expected: Vec<&str> = parts.iter().map(|part| part.label()).collect();
        if decoded.labels() != expected {
            return Err(KeyError::LabelMismatch {
                entity_type: E::ENTITY_TYPE.to_string(),
                expected: expected.iter().map(|label| label.to_string()).collect(),
                found: decoded.labels().iter().map(|label| label.to_string()).collect(),
            });
        }
        Ok(decoded)
    }

    /// The entity's own item: attributes, keys, index keys and type discriminator.
    pub fn item(&self, schema: &TableSchema, entity: &E) -> Result<Document, MapperError> {
        key::root_item(schema, self, entity)
    }

    /// Items representing `relation` for `owner`.
    pub fn link_items(
        &self,
        schema: &TableSchema,
        owner: &E,
        relation: &Relationship<E>,
    ) -> Result<Vec<Document>, MapperError> {
        key::relation_items(schema, self, owner, relation)
    }

    /// Items for every relationship declared on `E`.
    pub fn relationship_items(
        &self,
        schema: &TableSchema,
        owner: &E,
    ) -> Result<Vec<Document>, MapperError> {
        let mut items = Vec::new();
        for relation in &self.relationships {
            items.extend(self.link_items(schema, owner, relation)?);
        }
        Ok(items)
    }
}

/// Type-erased view of an [`EntityMapping`], used where the entity type is
/// only known at runtime (the change tracker).
pub(crate) trait ErasedMapping: Send + Sync {
    fn entity_type(&self) -> &'static str;
    fn is_versioned(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn related(&self) -> Vec<(&'static str, TypeId)>;
    fn index_names(&self) -> Vec<String>;
    fn item_key(&self, schema: &TableSchema, entity: &dyn Any) -> Result<ItemKey, MapperError>;
    fn item(&self, schema: &TableSchema, entity: &dyn Any) -> Result<Document, MapperError>;
    fn relationship_items(
        &self,
        schema: &TableSchema,
        entity: &dyn Any,
    ) -> Result<Vec<Document>, MapperError>;
}

fn downcast<E: Entity>(entity: &dyn Any) -> Result<&E, MapperError> {
    entity
        .downcast_ref::<E>()
        .ok_or_else(|| MapperError::UnknownEntity(E::ENTITY_TYPE.to_string()))
}

impl<E: Entity> ErasedMapping for EntityMapping<E> {
    fn entity_type(&self) -> &'static str {
        E::ENTITY_TYPE
    }

    fn is_versioned(&self) -> bool {
        self.versioned
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn related(&self) -> Vec<(&'static str, TypeId)> {
        self.relationships
            .iter()
            .map(|relation| (relation.related_type(), relation.related_id()))
            .collect()
    }

    fn index_names(&self) -> Vec<String> {
        self.indexes.iter().map(|index| index.name.clone()).collect()
    }

    fn item_key(&self, schema: &TableSchema, entity: &dyn Any) -> Result<ItemKey, MapperError> {
        Ok(EntityMapping::item_key(self, schema, downcast::<E>(entity)?)?)
    }

    fn item(&self, schema: &TableSchema, entity: &dyn Any) -> Result<Document, MapperError> {
        EntityMapping::item(self, schema, downcast::<E>(entity)?)
    }

    fn relationship_items(
        &self,
        schema: &TableSchema,
        entity: &dyn Any,
    ) -> Result<Vec<Document>, MapperError> {
        EntityMapping::relationship_items(self, schema, downcast::<E>(entity)?)
    }
}
