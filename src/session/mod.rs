//! Unit of work over the single table.
//!
//! A [`Session`] tracks the entities it loaded or was handed, diffs them
//! against their snapshots on save, and submits every resulting put and
//! delete as one conditional transactional write.
//!
//! ```ignore
//! let mut session = Session::new(schema, store);
//! let key = session.set::<Movie>()?.add(movie)?;
//! session.save_changes()?;
//!
//! let mut movies = session.set::<Movie>()?;
//! if let Some(movie) = movies.get_mut(&key) {
//!     movie.title = "Renamed".into();
//! }
//! session.save_changes()?;
//! ```

mod entity_set;
mod save;
mod tracker;

use std::sync::Arc;

use crate::entity::Entity;
use crate::error::MapperError;
use crate::schema::TableSchema;
use crate::store::{StoreClient, WriteOp};

pub use entity_set::{EntitySet, QueryOutcome};
pub use save::SaveSummary;
pub use tracker::{ChangeTracker, EntityKey, EntityState, TrackedEntry};

use save::SavePlan;

/// One logical unit of work. Not shared between threads; open one per task.
pub struct Session<S> {
    schema: Arc<TableSchema>,
    store: S,
    tracker: ChangeTracker,
}

impl<S: StoreClient> Session<S> {
    pub fn new(schema: Arc<TableSchema>, store: S) -> Self {
        Self {
            schema,
            store,
            tracker: ChangeTracker::new(),
        }
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Typed access to the entities of type `E`.
    pub fn set<E: Entity>(&mut self) -> Result<EntitySet<'_, E, S>, MapperError> {
        if !self.schema.contains::<E>() {
            return Err(MapperError::UnknownEntity(E::ENTITY_TYPE.to_string()));
        }
        Ok(EntitySet::new(
            Arc::clone(&self.schema),
            &self.store,
            &mut self.tracker,
        ))
    }

    pub fn state(&self, key: &EntityKey) -> Option<EntityState> {
        self.tracker.entry(key).map(TrackedEntry::state)
    }

    /// Last persisted version of a versioned entity.
    pub fn version(&self, key: &EntityKey) -> Option<u64> {
        self.tracker.entry(key).and_then(TrackedEntry::version)
    }

    /// Whether a save would write anything.
    pub fn has_changes(&self) -> Result<bool, MapperError> {
        let pending = self
            .tracker
            .iter()
            .any(|(_, entry)| entry.state() != EntityState::Unchanged);
        Ok(pending || !self.tracker.changed(&self.schema)?.is_empty())
    }

    /// Mark every edited, unchanged entry as modified. Returns how many were marked.
    pub fn detect_changes(&mut self) -> Result<usize, MapperError> {
        let changed = self.tracker.changed(&self.schema)?;
        for key in &changed {
            if let Some(entry) = self.tracker.entry_mut(key) {
                entry.state = EntityState::Modified;
            }
        }
        Ok(changed.len())
    }

    /// Stop tracking everything without writing.
    pub fn clear(&mut self) {
        self.tracker.clear();
    }

    /// Persist every pending change in one atomic write.
    ///
    /// On failure nothing was applied and the tracker is left exactly as it
    /// was, so the caller can reload and retry.
    pub fn save_changes(&mut self) -> Result<SaveSummary, MapperError> {
        let plan = SavePlan::build(&self.schema, &self.tracker)?;

        let mut summary = SaveSummary::default();
        for operation in plan.operations() {
            match operation {
                WriteOp::Put { .. } => summary.puts += 1,
                WriteOp::Delete { .. } => summary.deletes += 1,
            }
        }

        let (operations, conflicts, settlement) = plan.into_parts();
        if !operations.is_empty() {
            self.store
                .transact_write(operations)
                .map_err(|err| conflicts.resolve(err))?;
        }

        summary.entities = settlement.apply(&mut self.tracker);
        log::debug!(
            "saved {} puts and {} deletes for {} entities",
            summary.puts,
            summary.deletes,
            summary.entities
        );
        Ok(summary)
    }
}
