use std::fmt;
use std::sync::Arc;

use crate::value::{IntoKeyValue, Scalar};

pub(crate) type Selector<E> = Arc<dyn Fn(&E) -> Option<Scalar> + Send + Sync>;

/// Which key of an item a set of key parts composes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySection {
    Partition,
    Sort,
    IndexPartition(String),
    IndexSort(String),
}

impl fmt::Display for KeySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySection::Partition => write!(f, "partition key"),
            KeySection::Sort => write!(f, "sort key"),
            KeySection::IndexPartition(index) => write!(f, "{} partition key", index),
            KeySection::IndexSort(index) => write!(f, "{} sort key", index),
        }
    }
}

/// A labelled value contributing one `LABEL#value` segment to a composite key.
pub struct KeyPart<E> {
    label: String,
    selector: Selector<E>,
}

impl<E: 'static> KeyPart<E> {
    pub(crate) fn new<F, V>(label: impl Into<String>, selector: F) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: IntoKeyValue,
    {
        Self {
            label: label.into(),
            selector: Arc::new(move |entity: &E| selector(entity).into_key_value()),
        }
    }
}

impl<E> KeyPart<E> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Value of this part for `entity`, `None` when the path is absent.
    pub fn resolve(&self, entity: &E) -> Option<Scalar> {
        (self.selector)(entity)
    }
}

impl<E> Clone for KeyPart<E> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            selector: Arc::clone(&self.selector),
        }
    }
}

impl<E> fmt::Debug for KeyPart<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPart").field("label", &self.label).finish()
    }
}

/// Key parts of one secondary index.
pub struct IndexKeys<E> {
    pub(crate) name: String,
    pub(crate) partition: Vec<KeyPart<E>>,
    pub(crate) sort: Vec<KeyPart<E>>,
}

impl<E> IndexKeys<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_parts(&self) -> &[KeyPart<E>] {
        &self.partition
    }

    pub fn sort_parts(&self) -> &[KeyPart<E>] {
        &self.sort
    }
}
