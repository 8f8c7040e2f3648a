use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use super::tracker::{ChangeTracker, EntityKey, EntityState, TrackedEntry};
use crate::document::{regroup, Document, Grouped, MaterializeError};
use crate::entity::Entity;
use crate::error::MapperError;
use crate::key::ItemKey;
use crate::schema::TableSchema;
use crate::store::{SortKeyCondition, StoreClient};
use crate::value::AttributeValue;

/// Result of a query: the keys of the objects now tracked, and the items
/// that could not be materialized.
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub loaded: Vec<EntityKey>,
    pub failed: Vec<MaterializeError>,
}

/// Typed view of a session for entity type `E`.
///
/// Objects already tracked are never replaced by a later read, so edits made
/// through [`get_mut`](Self::get_mut) survive a query that returns the same item.
pub struct EntitySet<'s, E, S> {
    schema: Arc<TableSchema>,
    store: &'s S,
    tracker: &'s mut ChangeTracker,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity, S: StoreClient> EntitySet<'s, E, S> {
    pub(crate) fn new(schema: Arc<TableSchema>, store: &'s S, tracker: &'s mut ChangeTracker) -> Self {
        Self {
            schema,
            store,
            tracker,
            _entity: PhantomData,
        }
    }

    /// Tracking key for an object of this type.
    pub fn key_of(&self, entity: &E) -> Result<EntityKey, MapperError> {
        Ok(EntityKey::new(E::ENTITY_TYPE, self.schema.item_key(entity)?))
    }

    pub fn key(&self, partition_key: &str, sort_key: &str) -> EntityKey {
        EntityKey::new(E::ENTITY_TYPE, ItemKey::new(partition_key, sort_key))
    }

    /// Track a new object. It is written with a must-not-exist condition on
    /// the next save.
    pub fn add(&mut self, entity: E) -> Result<EntityKey, MapperError> {
        let key = self.key_of(&entity)?;
        if self.tracker.contains(&key) {
            return Err(MapperError::AlreadyTracked(key.to_string()));
        }
        // Surface key and attribute errors now rather than at save time.
        self.schema.to_item(&entity)?;

        log::trace!("tracking new {}", key);
        self.tracker.insert(key.clone(), TrackedEntry::added(entity));
        Ok(key)
    }

    /// Read one object by primary key, with its relationship collections.
    pub fn load(
        &mut self,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<&mut E>, MapperError> {
        let key = self.key(partition_key, sort_key);

        if !self.tracker.contains(&key) {
            let schema = Arc::clone(&self.schema);
            let items = if schema.mapping::<E>()?.relationships().is_empty() {
                self.store
                    .get(partition_key, sort_key)?
                    .into_iter()
                    .collect()
            } else {
                self.store.query(partition_key, &SortKeyCondition::All)?
            };

            let target = key.item_key();
            let label = target.to_string();
            for grouped in regroup::<E>(&schema, &items)? {
                match grouped {
                    Ok(grouped) if grouped.key == target => {
                        self.track(grouped)?;
                        break;
                    }
                    Err(err) if err.item.as_deref() == Some(label.as_str()) => {
                        return Err(err.into())
                    }
                    _ => {}
                }
            }
        }

        Ok(self.get_mut(&key))
    }

    /// Read the objects of one partition whose sort key matches `condition`.
    pub fn query(
        &mut self,
        partition_key: &str,
        condition: SortKeyCondition,
    ) -> Result<QueryOutcome, MapperError> {
        let items = self.store.query(partition_key, &condition)?;
        self.materialize(items, condition == SortKeyCondition::All)
    }

    /// Read the objects whose secondary index keys match.
    pub fn query_index(
        &mut self,
        index: &str,
        partition_key: &str,
        condition: SortKeyCondition,
    ) -> Result<QueryOutcome, MapperError> {
        let items = self.store.query_index(index, partition_key, &condition)?;
        self.materialize(items, false)
    }

    pub fn get(&self, key: &EntityKey) -> Option<&E> {
        self.tracker
            .entry(key)
            .filter(|entry| entry.state() != EntityState::Deleted)
            .and_then(|entry| entry.downcast_ref::<E>())
    }

    /// Mutable access. Edits are picked up by the diff at save time.
    pub fn get_mut(&mut self, key: &EntityKey) -> Option<&mut E> {
        self.tracker
            .entry_mut(key)
            .filter(|entry| entry.state() != EntityState::Deleted)
            .and_then(|entry| entry.downcast_mut::<E>())
    }

    /// Tracked, not deleted objects of this type in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &E)> + '_ {
        self.tracker
            .iter()
            .filter(|(_, entry)| entry.state() != EntityState::Deleted)
            .filter_map(|(key, entry)| entry.downcast_ref::<E>().map(|entity| (key, entity)))
    }

    /// Mark an object for deletion. Objects added in this session are
    /// simply forgotten.
    pub fn remove(&mut self, key: &EntityKey) -> Result<(), MapperError> {
        let state = self
            .tracker
            .entry(key)
            .filter(|entry| entry.downcast_ref::<E>().is_some())
            .map(TrackedEntry::state)
            .ok_or_else(|| MapperError::NotTracked(key.to_string()))?;

        if state == EntityState::Added {
            self.tracker.remove(key);
        } else if let Some(entry) = self.tracker.entry_mut(key) {
            entry.state = EntityState::Deleted;
        }
        Ok(())
    }

    /// Stop tracking an object and hand it back. Nothing is written for it.
    pub fn detach(&mut self, key: &EntityKey) -> Option<E> {
        self.tracker.entry(key)?.downcast_ref::<E>()?;
        let entry = self.tracker.remove(key)?;
        entry.entity.downcast::<E>().ok().map(|entity| *entity)
    }

    pub fn state(&self, key: &EntityKey) -> Option<EntityState> {
        self.tracker.entry(key).map(TrackedEntry::state)
    }

    pub fn version(&self, key: &EntityKey) -> Option<u64> {
        self.tracker.entry(key).and_then(TrackedEntry::version)
    }

    fn track(&mut self, grouped: Grouped<E>) -> Result<EntityKey, MapperError> {
        let key = EntityKey::new(E::ENTITY_TYPE, grouped.key);
        if !self.tracker.contains(&key) {
            let entry = TrackedEntry::loaded(&self.schema, grouped.entity, grouped.version)?;
            self.tracker.insert(key.clone(), entry);
        }
        Ok(key)
    }

    /// Regroup a result into objects and track them. A result that does not
    /// cover whole partitions is widened first, since relationship items can
    /// fall outside the matched range and an object tracked with a partial
    /// collection would lose the rest on its next save.
    fn materialize(
        &mut self,
        items: Vec<Document>,
        complete: bool,
    ) -> Result<QueryOutcome, MapperError> {
        let schema = Arc::clone(&self.schema);
        let mapping = schema.mapping::<E>()?;

        let grouped = if complete || mapping.relationships().is_empty() {
            regroup::<E>(&schema, &items)?
        } else {
            let roots = self.root_keys(&items);
            let wanted: HashSet<String> = roots.iter().map(ItemKey::to_string).collect();

            let mut partitions: Vec<&str> = Vec::new();
            for root in &roots {
                if !partitions.contains(&root.partition_key.as_str()) {
                    partitions.push(&root.partition_key);
                }
            }
            let mut widened = Vec::new();
            for partition in partitions {
                widened.extend(self.store.query(partition, &SortKeyCondition::All)?);
            }

            regroup::<E>(&schema, &widened)?
                .into_iter()
                .filter(|grouped| match grouped {
                    Ok(grouped) => roots.contains(&grouped.key),
                    Err(err) => err.item.as_ref().map_or(true, |item| wanted.contains(item)),
                })
                .collect()
        };

        let mut outcome = QueryOutcome::default();
        for grouped in grouped {
            match grouped {
                Ok(grouped) => outcome.loaded.push(self.track(grouped)?),
                Err(err) => {
                    log::debug!("skipping unreadable item: {}", err);
                    outcome.failed.push(err);
                }
            }
        }
        Ok(outcome)
    }

    /// Keys of the root items of type `E` in a result, in result order.
    fn root_keys(&self, items: &[Document]) -> Vec<ItemKey> {
        let options = self.schema.options();
        items
            .iter()
            .filter(|item| !item.contains_key(&options.relation_attribute))
            .filter(|item| {
                item.get(&options.type_attribute).and_then(AttributeValue::as_s)
                    == Some(E::ENTITY_TYPE)
            })
            .filter_map(|item| ItemKey::from_document(options, item))
            .collect()
    }
}
