extern crate self as single_table;

mod document;
mod entity;
mod error;
mod key;
mod schema;
mod session;
mod store;
mod value;

pub use document::{regroup, Document, Grouped, MaterializeError, MaterializeErrorKind, Materializer};
pub use entity::Entity;
pub use error::MapperError;
pub use key::{CompositeKey, ItemKey, KeyError, RelationItem};
pub use schema::{
    EntityBuilder, EntityMapping, IndexKeys, KeyPart, KeySection, Navigation, RelationKind,
    Relationship, SchemaBuilder, SchemaError, TableOptions, TableSchema,
};
pub use session::{
    ChangeTracker, EntityKey, EntitySet, EntityState, QueryOutcome, SaveSummary, Session,
    TrackedEntry,
};
pub use store::{InMemoryStore, Precondition, SortKeyCondition, StoreClient, StoreError, WriteOp};
pub use value::{
    AttributeValue, CodecError, IntoKeyValue, NativeCodec, Scalar, ScalarType, ValueCodec,
};

// Derive macro for `Entity`
pub use single_table_macros::Entity;
