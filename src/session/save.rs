//! Turns the tracker's state into one transactional write.
//!
//! Planning never mutates the tracker. The plan carries the commit actions
//! that are applied only after the store accepted the whole write.

use std::collections::{BTreeMap, HashSet};

use super::tracker::{ChangeTracker, Derived, EntityKey, EntityState, TrackedEntry};
use crate::document::Document;
use crate::error::MapperError;
use crate::key::ItemKey;
use crate::schema::TableSchema;
use crate::store::{Precondition, StoreError, WriteOp};
use crate::value::Scalar;

/// What a successful [`save_changes`](super::Session::save_changes) wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub puts: usize,
    pub deletes: usize,
    /// Entities whose tracking state was settled by the save.
    pub entities: usize,
}

enum Commit {
    Refresh {
        key: EntityKey,
        new_key: EntityKey,
        root: Document,
        related: BTreeMap<ItemKey, Document>,
        version: Option<u64>,
    },
    Forget(EntityKey),
}

pub(crate) struct SavePlan {
    operations: Vec<WriteOp>,
    /// Entity that produced each operation, by position.
    origins: Vec<EntityKey>,
    commits: Vec<Commit>,
    seen: HashSet<ItemKey>,
}

impl SavePlan {
    pub fn build(schema: &TableSchema, tracker: &ChangeTracker) -> Result<Self, MapperError> {
        let mut plan = SavePlan {
            operations: Vec::new(),
            origins: Vec::new(),
            commits: Vec::new(),
            seen: HashSet::new(),
        };

        for (key, entry) in tracker.iter() {
            match entry.state {
                EntityState::Deleted => plan.delete(schema, key, entry)?,
                EntityState::Added => plan.insert(schema, key, entry)?,
                EntityState::Unchanged | EntityState::Modified => {
                    plan.update(schema, key, entry)?
                }
            }
        }

        log::debug!(
            "save plan: {} operations for {} entities",
            plan.operations.len(),
            plan.commits.len()
        );
        Ok(plan)
    }

    pub fn operations(&self) -> &[WriteOp] {
        &self.operations
    }

    fn push(&mut self, origin: &EntityKey, target: &ItemKey, operation: WriteOp) {
        if !self.seen.insert(target.clone()) {
            log::trace!("skipping second operation on {}", target);
            return;
        }
        log::trace!("{} -> {:?}", origin, operation);
        self.operations.push(operation);
        self.origins.push(origin.clone());
    }

    fn insert(
        &mut self,
        schema: &TableSchema,
        key: &EntityKey,
        entry: &TrackedEntry,
    ) -> Result<(), MapperError> {
        let derived = entry.derive(schema)?;
        let version = versioned(schema, entry).then_some(1);

        self.push(
            key,
            &derived.key,
            WriteOp::Put {
                item: with_version(schema, derived.root.clone(), version),
                condition: Some(Precondition::NotExists),
            },
        );
        for (item_key, item) in &derived.related {
            self.push(
                key,
                item_key,
                WriteOp::Put {
                    item: item.clone(),
                    condition: None,
                },
            );
        }

        self.refresh(key, derived, version);
        Ok(())
    }

    fn update(
        &mut self,
        schema: &TableSchema,
        key: &EntityKey,
        entry: &TrackedEntry,
    ) -> Result<(), MapperError> {
        let derived = entry.derive(schema)?;
        if entry.state == EntityState::Unchanged && !entry.differs(&derived, key) {
            return Ok(());
        }

        let old_key = key.item_key();
        let rekeyed = derived.key != old_key;
        let root_changed = entry.original.as_ref() != Some(&derived.root);
        let versioned = versioned(schema, entry);
        let known = entry.version.unwrap_or(0);
        let version = versioned.then_some(known + 1);
        let check = versioned.then_some(Precondition::VersionEquals(known));

        if rekeyed {
            self.push(
                key,
                &old_key,
                WriteOp::Delete {
                    key: old_key.clone(),
                    condition: check,
                },
            );
            self.push(
                key,
                &derived.key,
                WriteOp::Put {
                    item: with_version(schema, derived.root.clone(), version),
                    condition: Some(Precondition::NotExists),
                },
            );
        } else if root_changed || versioned || entry.state == EntityState::Modified {
            self.push(
                key,
                &derived.key,
                WriteOp::Put {
                    item: with_version(schema, derived.root.clone(), version),
                    condition: check,
                },
            );
        }

        for (item_key, item) in &derived.related {
            if entry.related.get(item_key) != Some(item) {
                self.push(
                    key,
                    item_key,
                    WriteOp::Put {
                        item: item.clone(),
                        condition: None,
                    },
                );
            }
        }
        for item_key in entry.related.keys() {
            if !derived.related.contains_key(item_key) {
                self.push(
                    key,
                    item_key,
                    WriteOp::Delete {
                        key: item_key.clone(),
                        condition: None,
                    },
                );
            }
        }

        self.refresh(key, derived, version.or(entry.version));
        Ok(())
    }

    /// Deletes the root item and every relationship item the entry knows about.
    fn delete(
        &mut self,
        schema: &TableSchema,
        key: &EntityKey,
        entry: &TrackedEntry,
    ) -> Result<(), MapperError> {
        if entry.original.is_some() {
            let check = versioned(schema, entry)
                .then(|| Precondition::VersionEquals(entry.version.unwrap_or(0)));
            let root_key = key.item_key();
            self.push(
                key,
                &root_key,
                WriteOp::Delete {
                    key: root_key.clone(),
                    condition: check,
                },
            );
            for item_key in entry.related.keys() {
                self.push(
                    key,
                    item_key,
                    WriteOp::Delete {
                        key: item_key.clone(),
                        condition: None,
                    },
                );
            }
        }
        self.commits.push(Commit::Forget(key.clone()));
        Ok(())
    }

    fn refresh(&mut self, key: &EntityKey, derived: Derived, version: Option<u64>) {
        self.commits.push(Commit::Refresh {
            key: key.clone(),
            new_key: EntityKey::new(key.entity_type, derived.key),
            root: derived.root,
            related: derived.related,
            version,
        });
    }

    /// Hand the operations to the store and keep what is needed to settle
    /// the tracker afterwards.
    pub fn into_parts(self) -> (Vec<WriteOp>, Conflicts, Settlement) {
        (
            self.operations,
            Conflicts {
                origins: self.origins,
            },
            Settlement {
                commits: self.commits,
            },
        )
    }
}

/// Maps a failed operation back to the entity that produced it.
pub(crate) struct Conflicts {
    origins: Vec<EntityKey>,
}

impl Conflicts {
    pub fn resolve(&self, err: StoreError) -> MapperError {
        match err {
            StoreError::ConditionFailed { index } => match self.origins.get(index) {
                Some(origin) => {
                    log::warn!("concurrency conflict on {}", origin);
                    MapperError::ConcurrencyConflict {
                        entity_type: origin.entity_type.to_string(),
                        partition_key: origin.partition_key.clone(),
                        sort_key: origin.sort_key.clone(),
                    }
                }
                None => MapperError::Transport(err.to_string()),
            },
            other => MapperError::from(other),
        }
    }
}

/// Tracker updates applied after a successful write.
pub(crate) struct Settlement {
    commits: Vec<Commit>,
}

impl Settlement {
    pub fn apply(self, tracker: &mut ChangeTracker) -> usize {
        let settled = self.commits.len();
        for commit in self.commits {
            match commit {
                Commit::Forget(key) => {
                    tracker.remove(&key);
                }
                Commit::Refresh {
                    key,
                    new_key,
                    root,
                    related,
                    version,
                } => {
                    if let Some(mut entry) = tracker.remove(&key) {
                        entry.state = EntityState::Unchanged;
                        entry.original = Some(root);
                        entry.related = related;
                        entry.version = version;
                        tracker.insert(new_key, entry);
                    }
                }
            }
        }
        settled
    }
}

fn versioned(schema: &TableSchema, entry: &TrackedEntry) -> bool {
    schema
        .erased(entry.type_id)
        .map_or(false, |mapping| mapping.is_versioned())
}

fn with_version(schema: &TableSchema, mut item: Document, version: Option<u64>) -> Document {
    if let Some(version) = version {
        item.insert(
            schema.options().version_attribute.clone(),
            schema.codec().encode(&Scalar::UInt(version)),
        );
    }
    item
}
