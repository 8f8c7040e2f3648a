//! Schema compiler: fluent per-entity configuration frozen into a [`TableSchema`].

mod builder;
mod error;
mod key_part;
mod mapping;
mod options;
mod relationship;
mod table;

pub use builder::{EntityBuilder, SchemaBuilder};
pub use error::SchemaError;
pub use key_part::{IndexKeys, KeyPart, KeySection};
pub use mapping::EntityMapping;
pub(crate) use mapping::ErasedMapping;
pub use options::TableOptions;
pub use relationship::{Navigation, RelationKind, Relationship};
pub use table::TableSchema;
