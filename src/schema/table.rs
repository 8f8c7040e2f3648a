use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::mapping::ErasedMapping;
use super::{EntityMapping, KeySection, SchemaBuilder, TableOptions};
use crate::document::{Document, MaterializeError, Materializer};
use crate::entity::Entity;
use crate::error::MapperError;
use crate::key::{CompositeKey, ItemKey};
use crate::value::ValueCodec;

/// Immutable, compiled layout of every entity type sharing the table.
///
/// Produced once by [`SchemaBuilder::compile`] and shared through `Arc`;
/// there is no way to change it afterwards.
pub struct TableSchema {
    pub(super) options: TableOptions,
    pub(super) codec: Arc<dyn ValueCodec>,
    pub(super) entities: HashMap<TypeId, Box<dyn ErasedMapping>>,
    pub(super) names: HashMap<&'static str, TypeId>,
    pub(super) reserved: Vec<String>,
}

impl TableSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn codec(&self) -> &dyn ValueCodec {
        self.codec.as_ref()
    }

    pub fn materializer(&self) -> Materializer<'_> {
        Materializer::new(self.codec.as_ref())
    }

    /// Key, bookkeeping and index attribute names; never decoded into entities.
    pub fn reserved_attributes(&self) -> &[String] {
        &self.reserved
    }

    pub fn entity_types(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.names.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn contains<E: Entity>(&self) -> bool {
        self.entities.contains_key(&TypeId::of::<E>())
    }

    pub fn mapping<E: Entity>(&self) -> Result<&EntityMapping<E>, MapperError> {
        self.entities
            .get(&TypeId::of::<E>())
            .and_then(|mapping| mapping.as_any().downcast_ref::<EntityMapping<E>>())
            .ok_or_else(|| MapperError::UnknownEntity(E::ENTITY_TYPE.to_string()))
    }

    pub(crate) fn erased(&self, type_id: TypeId) -> Option<&dyn ErasedMapping> {
        self.entities.get(&type_id).map(|mapping| &**mapping)
    }

    pub fn build_partition_key<E: Entity>(&self, entity: &E) -> Result<String, MapperError> {
        Ok(self.mapping::<E>()?.partition_key(self, entity)?)
    }

    pub fn build_sort_key<E: Entity>(&self, entity: &E) -> Result<String, MapperError> {
        Ok(self.mapping::<E>()?.sort_key(self, entity)?)
    }

    pub fn item_key<E: Entity>(&self, entity: &E) -> Result<ItemKey, MapperError> {
        Ok(self.mapping::<E>()?.item_key(self, entity)?)
    }

    /// The item `entity` is stored as, without its version attribute.
    pub fn to_item<E: Entity>(&self, entity: &E) -> Result<Document, MapperError> {
        self.mapping::<E>()?.item(self, entity)
    }

    /// Relationship items for the `E -> R` relationship of `entity`.
    pub fn build_link_items<E: Entity, R: Entity>(
        &self,
        entity: &E,
    ) -> Result<Vec<Document>, MapperError> {
        let mapping = self.mapping::<E>()?;
        let relation = mapping.relationship(R::ENTITY_TYPE).ok_or_else(|| {
            MapperError::UnknownEntity(format!("{} -> {}", E::ENTITY_TYPE, R::ENTITY_TYPE))
        })?;
        mapping.link_items(self, entity, relation)
    }

    pub fn decode_key<E: Entity>(
        &self,
        section: &KeySection,
        raw: &str,
    ) -> Result<CompositeKey, MapperError> {
        Ok(self.mapping::<E>()?.decode_key(self, section, raw)?)
    }

    /// Decode a stored item of type `E`, ignoring reserved attributes.
    pub fn to_object<E: Entity>(&self, item: &Document) -> Result<E, MaterializeError> {
        let object = self.materializer().to_object(item, &self.reserved);
        match ItemKey::from_document(&self.options, item) {
            Some(key) => object.map_err(|err| err.with_item(key.to_string())),
            None => object,
        }
    }
}

impl fmt::Debug for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSchema")
            .field("options", &self.options)
            .field("entity_types", &self.entity_types())
            .finish()
    }
}
