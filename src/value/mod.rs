//! Native attribute values and the scalar codec.
//!
//! The store speaks in [`AttributeValue`]s. Key parts and materialized fields
//! are expressed as [`Scalar`]s and converted through a [`ValueCodec`], so the
//! mapping layer never guesses at a representation.

mod attribute;
mod codec;
mod scalar;

pub use attribute::AttributeValue;
pub use codec::{CodecError, NativeCodec, ValueCodec};
pub use scalar::{IntoKeyValue, Scalar, ScalarType};
