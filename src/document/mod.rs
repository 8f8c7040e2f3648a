//! Items as they live in the store, and their conversion to typed objects.

mod error;
mod materializer;
mod regroup;

use std::collections::BTreeMap;

use crate::value::AttributeValue;

pub use error::{MaterializeError, MaterializeErrorKind};
pub use materializer::Materializer;
pub use regroup::{regroup, Grouped};

/// One stored item: attribute name to native value.
pub type Document = BTreeMap<String, AttributeValue>;
