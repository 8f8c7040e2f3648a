use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;

use super::mapping::ErasedMapping;
use super::{
    EntityMapping, IndexKeys, KeyPart, KeySection, Navigation, RelationKind, Relationship,
    SchemaError, TableOptions, TableSchema,
};
use crate::entity::Entity;
use crate::value::{IntoKeyValue, NativeCodec, ValueCodec};

struct PendingIndex<E> {
    name: String,
    partition: Option<Vec<KeyPart<E>>>,
    sort: Option<Vec<KeyPart<E>>>,
}

fn pending_index<'a, E>(
    indexes: &'a mut Vec<PendingIndex<E>>,
    name: &str,
) -> &'a mut PendingIndex<E> {
    let position = match indexes.iter().position(|index| index.name == name) {
        Some(position) => position,
        None => {
            indexes.push(PendingIndex {
                name: name.to_string(),
                partition: None,
                sort: None,
            });
            indexes.len() - 1
        }
    };
    &mut indexes[position]
}

/// Fluent key and relationship configuration for one entity type.
///
/// Calls are order-sensitive: [`include`](Self::include) appends to the key
/// opened most recently. Mistakes are recorded and reported by
/// [`SchemaBuilder::compile`], never at first use.
pub struct EntityBuilder<E> {
    partition: Option<Vec<KeyPart<E>>>,
    sort: Option<Vec<KeyPart<E>>>,
    indexes: Vec<PendingIndex<E>>,
    open: Option<KeySection>,
    relationships: Vec<Relationship<E>>,
    versioned: bool,
    errors: Vec<SchemaError>,
}

impl<E: Entity> Default for EntityBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityBuilder<E> {
    pub fn new() -> Self {
        Self {
            partition: None,
            sort: None,
            indexes: Vec::new(),
            open: None,
            relationships: Vec::new(),
            versioned: false,
            errors: Vec::new(),
        }
    }

    pub fn has_partition_key<F, V>(mut self, selector: F, label: &str) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: IntoKeyValue,
    {
        self.open_section(KeySection::Partition, KeyPart::new(label, selector));
        self
    }

    pub fn has_sort_key<F, V>(mut self, selector: F, label: &str) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: IntoKeyValue,
    {
        self.open_section(KeySection::Sort, KeyPart::new(label, selector));
        self
    }

    pub fn has_index_partition_key<F, V>(mut self, index: &str, selector: F, label: &str) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: IntoKeyValue,
    {
        self.open_section(
            KeySection::IndexPartition(index.to_string()),
            KeyPart::new(label, selector),
        );
        self
    }

    pub fn has_index_sort_key<F, V>(mut self, index: &str, selector: F, label: &str) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: IntoKeyValue,
    {
        self.open_section(
            KeySection::IndexSort(index.to_string()),
            KeyPart::new(label, selector),
        );
        self
    }

    /// Append another part to the key declared just before this call.
    pub fn include<F, V>(mut self, selector: F, label: &str) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: IntoKeyValue,
    {
        let part = KeyPart::new(label, selector);
        match self.open.clone() {
            Some(section) => {
                if let Some(parts) = self.slot(&section).as_mut() {
                    parts.push(part);
                }
            }
            None => self.errors.push(SchemaError::IncludeWithoutKey {
                entity_type: E::ENTITY_TYPE.to_string(),
                label: label.to_string(),
            }),
        }
        self
    }

    /// Children stored in this entity's partition.
    pub fn has_one_to_many<R: Entity>(mut self, navigation: Navigation<E, R>) -> Self {
        self.relationships
            .push(Relationship::new(RelationKind::OneToMany, navigation));
        self
    }

    /// Symmetric link items between this entity and `R`.
    pub fn has_many_to_many<R: Entity>(mut self, navigation: Navigation<E, R>) -> Self {
        self.relationships
            .push(Relationship::new(RelationKind::ManyToMany, navigation));
        self
    }

    /// Guard every write with a version check and bump the version on success.
    pub fn has_versioning(mut self) -> Self {
        self.versioned = true;
        self
    }

    fn slot(&mut self, section: &KeySection) -> &mut Option<Vec<KeyPart<E>>> {
        match section {
            KeySection::Partition => &mut self.partition,
            KeySection::Sort => &mut self.sort,
            KeySection::IndexPartition(name) => {
                &mut pending_index(&mut self.indexes, name).partition
            }
            KeySection::IndexSort(name) => &mut pending_index(&mut self.indexes, name).sort,
        }
    }

    fn open_section(&mut self, section: KeySection, part: KeyPart<E>) {
        if self.slot(&section).is_some() {
            self.errors.push(SchemaError::DuplicateSection {
                entity_type: E::ENTITY_TYPE.to_string(),
                section,
            });
            return;
        }
        *self.slot(&section) = Some(vec![part]);
        self.open = Some(section);
    }

    pub(crate) fn build(self, options: &TableOptions) -> Result<EntityMapping<E>, SchemaError> {
        let entity_type = E::ENTITY_TYPE;
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let partition = self.partition.ok_or_else(|| SchemaError::MissingPartitionKey {
            entity_type: entity_type.to_string(),
        })?;
        let sort = self.sort.unwrap_or_default();
        validate_parts(options, entity_type, &KeySection::Partition, &partition)?;
        validate_parts(options, entity_type, &KeySection::Sort, &sort)?;

        let mut indexes = Vec::with_capacity(self.indexes.len());
        for index in self.indexes {
            let partition = index
                .partition
                .ok_or_else(|| SchemaError::MissingIndexPartitionKey {
                    entity_type: entity_type.to_string(),
                    index: index.name.clone(),
                })?;
            let sort = index.sort.unwrap_or_default();
            validate_parts(
                options,
                entity_type,
                &KeySection::IndexPartition(index.name.clone()),
                &partition,
            )?;
            validate_parts(
                options,
                entity_type,
                &KeySection::IndexSort(index.name.clone()),
                &sort,
            )?;
            indexes.push(IndexKeys {
                name: index.name,
                partition,
                sort,
            });
        }

        let mut related = HashSet::new();
        for relation in &self.relationships {
            if !related.insert(relation.related_id()) {
                return Err(SchemaError::DuplicateRelation {
                    entity_type: entity_type.to_string(),
                    related_type: relation.related_type().to_string(),
                });
            }
        }

        Ok(EntityMapping {
            partition,
            sort,
            indexes,
            relationships: self.relationships,
            versioned: self.versioned,
        })
    }
}

fn validate_parts<E>(
    options: &TableOptions,
    entity_type: &str,
    section: &KeySection,
    parts: &[KeyPart<E>],
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for part in parts {
        let label = part.label();
        if label.is_empty() || label.contains(options.delimiter) {
            return Err(SchemaError::InvalidLabel {
                entity_type: entity_type.to_string(),
                label: label.to_string(),
            });
        }
        if !seen.insert(label) {
            return Err(SchemaError::DuplicateLabel {
                entity_type: entity_type.to_string(),
                section: section.clone(),
                label: label.to_string(),
            });
        }
    }
    Ok(())
}

type BuildFn = Box<dyn FnOnce(&TableOptions) -> Result<Box<dyn ErasedMapping>, SchemaError>>;

struct PendingEntity {
    type_id: TypeId,
    entity_type: &'static str,
    build: BuildFn,
}

/// Collects entity configurations and compiles them into a [`TableSchema`].
///
/// ```ignore
/// let schema = SchemaBuilder::new()
///     .entity::<Movie, _>(|movie| {
///         movie
///             .has_partition_key(|m: &Movie| m.id.clone(), "MOVIE")
///             .has_many_to_many(nav!(Movie, cast))
///             .has_versioning()
///     })
///     .entity::<Actor, _>(|actor| actor.has_partition_key(|a: &Actor| a.id.clone(), "ACTOR"))
///     .compile()?;
/// ```
pub struct SchemaBuilder {
    options: TableOptions,
    codec: Arc<dyn ValueCodec>,
    entities: Vec<PendingEntity>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            options: TableOptions::default(),
            codec: Arc::new(NativeCodec),
            entities: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_codec<C: ValueCodec + 'static>(mut self, codec: C) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Register `E` and configure its keys and relationships.
    pub fn entity<E, F>(mut self, configure: F) -> Self
    where
        E: Entity,
        F: FnOnce(EntityBuilder<E>) -> EntityBuilder<E>,
    {
        let builder = configure(EntityBuilder::new());
        self.entities.push(PendingEntity {
            type_id: TypeId::of::<E>(),
            entity_type: E::ENTITY_TYPE,
            build: Box::new(move |options: &TableOptions| {
                builder
                    .build(options)
                    .map(|mapping| Box::new(mapping) as Box<dyn ErasedMapping>)
            }),
        });
        self
    }

    /// Freeze the configuration. Every configuration error surfaces here.
    pub fn compile(self) -> Result<Arc<TableSchema>, SchemaError> {
        let options = self.options;
        let mut reserved = options.reserved_attributes();
        let distinct: HashSet<&String> = reserved.iter().collect();
        if distinct.len() != reserved.len() {
            return Err(SchemaError::ReservedAttributes(format!(
                "{:?} must be distinct",
                reserved
            )));
        }

        let mut order = Vec::with_capacity(self.entities.len());
        let mut entities: HashMap<TypeId, Box<dyn ErasedMapping>> = HashMap::new();
        let mut names: HashMap<&'static str, TypeId> = HashMap::new();

        for pending in self.entities {
            if entities.contains_key(&pending.type_id) || names.contains_key(pending.entity_type) {
                return Err(SchemaError::DuplicateEntity {
                    entity_type: pending.entity_type.to_string(),
                });
            }
            let mapping = (pending.build)(&options)?;
            names.insert(pending.entity_type, pending.type_id);
            entities.insert(pending.type_id, mapping);
            order.push(pending.type_id);
        }

        for type_id in &order {
            let mapping = &entities[type_id];
            for (related_type, related_id) in mapping.related() {
                if !entities.contains_key(&related_id) {
                    return Err(SchemaError::UnregisteredRelation {
                        entity_type: mapping.entity_type().to_string(),
                        related_type: related_type.to_string(),
                    });
                }
            }
            for index in mapping.index_names() {
                for attribute in [
                    options.index_partition_attribute(&index),
                    options.index_sort_attribute(&index),
                ] {
                    if !reserved.contains(&attribute) {
                        reserved.push(attribute);
                    }
                }
            }
        }

        debug!(
            "compiled schema for table {} with {} entity types",
            options.table_name,
            order.len()
        );

        Ok(Arc::new(TableSchema {
            options,
            codec: self.codec,
            entities,
            names,
            reserved,
        }))
    }
}
