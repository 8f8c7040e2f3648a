//! InMemoryStore - ordered map backed store client for tests and development.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use super::{Precondition, SortKeyCondition, StoreClient, StoreError, WriteOp};
use crate::document::Document;
use crate::key::ItemKey;
use crate::schema::TableOptions;

/// In-memory table keyed by primary key.
///
/// Items are kept as serialized bytes so every read hands out a fresh copy.
/// Clone-friendly via Arc: clones share the same table, which is how tests
/// simulate two clients racing on one item.
#[derive(Clone)]
pub struct InMemoryStore {
    options: TableOptions,
    items: Arc<RwLock<BTreeMap<ItemKey, Vec<u8>>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_options(TableOptions::default())
    }

    /// Store using the attribute names of a non-default table layout.
    pub fn with_options(options: TableOptions) -> Self {
        Self {
            options,
            items: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored item, ordered by primary key.
    pub fn items(&self) -> Result<Vec<Document>, StoreError> {
        let items = self.read()?;
        items.values().map(|bytes| decode(bytes)).collect()
    }

    /// Write an item without any condition, bypassing transactions.
    pub fn put_raw(&self, item: Document) -> Result<(), StoreError> {
        let key = self.key_of(&item)?;
        let bytes = encode(&item)?;
        self.write()?.insert(key, bytes);
        Ok(())
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<ItemKey, Vec<u8>>>, StoreError> {
        self.items
            .read()
            .map_err(|_| StoreError::Transport("lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<ItemKey, Vec<u8>>>, StoreError> {
        self.items
            .write()
            .map_err(|_| StoreError::Transport("lock poisoned".into()))
    }

    fn key_of(&self, item: &Document) -> Result<ItemKey, StoreError> {
        ItemKey::from_document(&self.options, item).ok_or_else(|| {
            StoreError::Validation(format!(
                "item is missing {} or {}",
                self.options.partition_key_attribute, self.options.sort_key_attribute
            ))
        })
    }

    fn stored_version(&self, item: &Document) -> Result<u64, StoreError> {
        match item.get(&self.options.version_attribute) {
            None => Ok(0),
            Some(value) => value
                .as_n()
                .and_then(|n| n.parse::<u64>().ok())
                .ok_or_else(|| {
                    StoreError::Validation(format!(
                        "{} holds {} instead of a version number",
                        self.options.version_attribute, value
                    ))
                }),
        }
    }

    fn holds(
        &self,
        items: &BTreeMap<ItemKey, Vec<u8>>,
        key: &ItemKey,
        condition: Precondition,
    ) -> Result<bool, StoreError> {
        match condition {
            Precondition::NotExists => Ok(!items.contains_key(key)),
            Precondition::VersionEquals(expected) => match items.get(key) {
                Some(bytes) => Ok(self.stored_version(&decode(bytes)?)? == expected),
                None => Ok(false),
            },
        }
    }
}

fn encode(item: &Document) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(item).map_err(|e| StoreError::Validation(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Document, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Transport(e.to_string()))
}

enum Staged {
    Put(ItemKey, Vec<u8>),
    Delete(ItemKey),
}

impl StoreClient for InMemoryStore {
    fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Document>, StoreError> {
        let items = self.read()?;
        items
            .get(&ItemKey::new(partition_key, sort_key))
            .map(|bytes| decode(bytes))
            .transpose()
    }

    fn query(
        &self,
        partition_key: &str,
        condition: &SortKeyCondition,
    ) -> Result<Vec<Document>, StoreError> {
        let items = self.read()?;
        let start = ItemKey::new(partition_key, "");

        items
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|(key, _)| key.partition_key == partition_key)
            .filter(|(key, _)| condition.matches(&key.sort_key))
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }

    fn query_index(
        &self,
        index: &str,
        partition_key: &str,
        condition: &SortKeyCondition,
    ) -> Result<Vec<Document>, StoreError> {
        let partition_attribute = self.options.index_partition_attribute(index);
        let sort_attribute = self.options.index_sort_attribute(index);
        let items = self.read()?;

        let mut matched = Vec::new();
        for bytes in items.values() {
            let item = decode(bytes)?;
            let in_partition = item
                .get(&partition_attribute)
                .and_then(|value| value.as_s())
                .map_or(false, |value| value == partition_key);
            if !in_partition {
                continue;
            }

            let sort_key = item
                .get(&sort_attribute)
                .and_then(|value| value.as_s())
                .map(str::to_string);
            let keep = match &sort_key {
                Some(sort_key) => condition.matches(sort_key),
                None => *condition == SortKeyCondition::All,
            };
            if keep {
                matched.push((sort_key.unwrap_or_default(), item));
            }
        }

        // Stable sort keeps primary key order between equal index sort keys.
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matched.into_iter().map(|(_, item)| item).collect())
    }

    fn transact_write(&self, operations: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut items = self.write()?;
        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(operations.len());

        for (index, operation) in operations.iter().enumerate() {
            let key = match operation {
                WriteOp::Put { item, .. } => self.key_of(item)?,
                WriteOp::Delete { key, .. } => key.clone(),
            };

            if !seen.insert(key.clone()) {
                return Err(StoreError::Validation(format!(
                    "transaction touches {} more than once",
                    key
                )));
            }

            if let Some(condition) = operation.condition() {
                if !self.holds(&items, &key, condition)? {
                    log::trace!("condition {:?} failed on {}", condition, key);
                    return Err(StoreError::ConditionFailed { index });
                }
            }

            staged.push(match operation {
                WriteOp::Put { item, .. } => Staged::Put(key, encode(item)?),
                WriteOp::Delete { .. } => Staged::Delete(key),
            });
        }

        for op in staged {
            match op {
                Staged::Put(key, bytes) => {
                    items.insert(key, bytes);
                }
                Staged::Delete(key) => {
                    items.remove(&key);
                }
            }
        }

        Ok(())
    }
}
