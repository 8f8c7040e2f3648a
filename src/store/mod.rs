//! The store client boundary.
//!
//! The mapper only needs point reads, partition queries and one atomic
//! conditional batch write. Retries, pagination and timeouts belong to the
//! client implementation.

mod error;
mod in_memory;

use std::sync::Arc;

use crate::document::Document;
use crate::key::ItemKey;

pub use error::StoreError;
pub use in_memory::InMemoryStore;

/// Sort-key restriction for a partition query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyCondition {
    All,
    Equals(String),
    BeginsWith(String),
    /// Inclusive on both ends.
    Between(String, String),
    LessThan(String),
    GreaterThan(String),
}

impl SortKeyCondition {
    pub fn matches(&self, sort_key: &str) -> bool {
        match self {
            SortKeyCondition::All => true,
            SortKeyCondition::Equals(value) => sort_key == value,
            SortKeyCondition::BeginsWith(prefix) => sort_key.starts_with(prefix.as_str()),
            SortKeyCondition::Between(low, high) => {
                sort_key >= low.as_str() && sort_key <= high.as_str()
            }
            SortKeyCondition::LessThan(value) => sort_key < value.as_str(),
            SortKeyCondition::GreaterThan(value) => sort_key > value.as_str(),
        }
    }
}

/// Condition evaluated by the store before applying a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No item exists under the key.
    NotExists,
    /// The stored version attribute equals the value. A stored item without
    /// a version attribute counts as version 0.
    VersionEquals(u64),
}

/// One operation of a transactional write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        item: Document,
        condition: Option<Precondition>,
    },
    Delete {
        key: ItemKey,
        condition: Option<Precondition>,
    },
}

impl WriteOp {
    pub fn condition(&self) -> Option<Precondition> {
        match self {
            WriteOp::Put { condition, .. } | WriteOp::Delete { condition, .. } => *condition,
        }
    }
}

/// Raw item access used by the mapper.
pub trait StoreClient: Send + Sync {
    fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Document>, StoreError>;

    /// Items of one partition in ascending sort-key order.
    fn query(
        &self,
        partition_key: &str,
        condition: &SortKeyCondition,
    ) -> Result<Vec<Document>, StoreError>;

    /// Items whose secondary index keys match, in ascending index sort-key order.
    fn query_index(
        &self,
        index: &str,
        partition_key: &str,
        condition: &SortKeyCondition,
    ) -> Result<Vec<Document>, StoreError>;

    /// Apply every operation or none. A failed precondition is reported as
    /// [`StoreError::ConditionFailed`] with the operation's position.
    fn transact_write(&self, operations: Vec<WriteOp>) -> Result<(), StoreError>;
}

impl<S: StoreClient + ?Sized> StoreClient for Arc<S> {
    fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Document>, StoreError> {
        (**self).get(partition_key, sort_key)
    }

    fn query(
        &self,
        partition_key: &str,
        condition: &SortKeyCondition,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).query(partition_key, condition)
    }

    fn query_index(
        &self,
        index: &str,
        partition_key: &str,
        condition: &SortKeyCondition,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).query_index(index, partition_key, condition)
    }

    fn transact_write(&self, operations: Vec<WriteOp>) -> Result<(), StoreError> {
        (**self).transact_write(operations)
    }
}
