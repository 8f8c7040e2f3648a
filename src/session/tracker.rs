use std::any::{Any, TypeId};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use crate::document::Document;
use crate::entity::Entity;
use crate::error::MapperError;
use crate::key::{ItemKey, KeyError};
use crate::schema::TableSchema;

/// Identity of a tracked entity: its type and primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    pub entity_type: &'static str,
    pub partition_key: String,
    pub sort_key: String,
}

impl EntityKey {
    pub fn new(entity_type: &'static str, key: ItemKey) -> Self {
        Self {
            entity_type,
            partition_key: key.partition_key,
            sort_key: key.sort_key,
        }
    }

    pub fn item_key(&self) -> ItemKey {
        ItemKey::new(self.partition_key.clone(), self.sort_key.clone())
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({} / {})",
            self.entity_type, self.partition_key, self.sort_key
        )
    }
}

/// Tracking state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

/// Items an entity derives to with the current schema.
pub(crate) struct Derived {
    pub key: ItemKey,
    pub root: Document,
    pub related: BTreeMap<ItemKey, Document>,
}

impl Derived {
    pub fn of(
        schema: &TableSchema,
        type_id: TypeId,
        entity: &dyn Any,
    ) -> Result<Self, MapperError> {
        let mapping = schema
            .erased(type_id)
            .ok_or_else(|| MapperError::UnknownEntity(format!("{:?}", type_id)))?;
        let key = mapping.item_key(schema, entity)?;
        let root = mapping.item(schema, entity)?;
        let related = keyed(schema, mapping.relationship_items(schema, entity)?)?;
        Ok(Self { key, root, related })
    }
}

fn keyed(
    schema: &TableSchema,
    items: Vec<Document>,
) -> Result<BTreeMap<ItemKey, Document>, KeyError> {
    items
        .into_iter()
        .map(|item| {
            ItemKey::from_document(schema.options(), &item)
                .map(|key| (key, item))
                .ok_or_else(|| KeyError::Malformed {
                    key: String::new(),
                    reason: "relationship item without key attributes".to_string(),
                })
        })
        .collect()
}

/// One entity held by a session with the snapshot it is diffed against.
pub struct TrackedEntry {
    pub(crate) entity: Box<dyn Any + Send + Sync>,
    pub(crate) type_id: TypeId,
    pub(crate) state: EntityState,
    /// Root item as last persisted; `None` until the first successful save.
    pub(crate) original: Option<Document>,
    /// Relationship items as last persisted.
    pub(crate) related: BTreeMap<ItemKey, Document>,
    pub(crate) version: Option<u64>,
}

impl TrackedEntry {
    pub(crate) fn added<E: Entity>(entity: E) -> Self {
        Self {
            entity: Box::new(entity),
            type_id: TypeId::of::<E>(),
            state: EntityState::Added,
            original: None,
            related: BTreeMap::new(),
            version: None,
        }
    }

    /// Entry for an entity read from the store. The snapshot is derived from
    /// the materialized object so the first diff compares like with like.
    pub(crate) fn loaded<E: Entity>(
        schema: &TableSchema,
        entity: E,
        version: Option<u64>,
    ) -> Result<Self, MapperError> {
        let derived = Derived::of(schema, TypeId::of::<E>(), &entity)?;
        Ok(Self {
            entity: Box::new(entity),
            type_id: TypeId::of::<E>(),
            state: EntityState::Unchanged,
            original: Some(derived.root),
            related: derived.related,
            version,
        })
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn original(&self) -> Option<&Document> {
        self.original.as_ref()
    }

    pub(crate) fn entity(&self) -> &dyn Any {
        &*self.entity
    }

    pub(crate) fn downcast_ref<E: Entity>(&self) -> Option<&E> {
        self.entity.downcast_ref::<E>()
    }

    pub(crate) fn downcast_mut<E: Entity>(&mut self) -> Option<&mut E> {
        self.entity.downcast_mut::<E>()
    }

    pub(crate) fn derive(&self, schema: &TableSchema) -> Result<Derived, MapperError> {
        Derived::of(schema, self.type_id, self.entity())
    }

    /// Whether the entity no longer matches its snapshot.
    pub(crate) fn differs(&self, derived: &Derived, key: &EntityKey) -> bool {
        self.original.as_ref() != Some(&derived.root)
            || derived.key != key.item_key()
            || self.related != derived.related
    }
}

impl fmt::Debug for TrackedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedEntry")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("related", &self.related.len())
            .finish()
    }
}

/// Identity map of the entities a session knows about.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: BTreeMap<EntityKey, TrackedEntry>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entry(&self, key: &EntityKey) -> Option<&TrackedEntry> {
        self.entries.get(key)
    }

    pub(crate) fn entry_mut(&mut self, key: &EntityKey) -> Option<&mut TrackedEntry> {
        self.entries.get_mut(key)
    }

    pub(crate) fn insert(&mut self, key: EntityKey, entry: TrackedEntry) {
        self.entries.insert(key, entry);
    }

    pub(crate) fn remove(&mut self, key: &EntityKey) -> Option<TrackedEntry> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, EntityKey, TrackedEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entries.keys()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keys of unchanged entries whose objects were edited since the last
    /// load or save.
    pub(crate) fn changed(&self, schema: &TableSchema) -> Result<Vec<EntityKey>, MapperError> {
        let mut changed = Vec::new();
        for (key, entry) in &self.entries {
            if entry.state != EntityState::Unchanged {
                continue;
            }
            if entry.differs(&entry.derive(schema)?, key) {
                changed.push(key.clone());
            }
        }
        Ok(changed)
    }
}
