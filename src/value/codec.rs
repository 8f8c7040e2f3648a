use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{AttributeValue, Scalar, ScalarType};

/// Error raised when a native value cannot be decoded into the requested scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    TypeMismatch {
        expected: ScalarType,
        found: &'static str,
    },
    InvalidNumber {
        expected: ScalarType,
        value: String,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::TypeMismatch { expected, found } => {
                write!(f, "expected {} but found {} value", expected, found)
            }
            CodecError::InvalidNumber { expected, value } => {
                write!(f, "number {:?} is not a valid {}", value, expected)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Converts scalars to and from the store's native values.
pub trait ValueCodec: Send + Sync {
    fn encode(&self, scalar: &Scalar) -> AttributeValue;

    /// Decode `value` as `expected`. Must fail rather than coerce across types.
    fn decode(&self, value: &AttributeValue, expected: ScalarType) -> Result<Scalar, CodecError>;

    /// Stable string form of a scalar inside a composite key.
    fn key_string(&self, scalar: &Scalar) -> String;
}

/// Default codec: numbers as decimal strings, binary as bytes (base64 inside keys).
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl ValueCodec for NativeCodec {
    fn encode(&self, scalar: &Scalar) -> AttributeValue {
        match scalar {
            Scalar::String(value) => AttributeValue::S(value.clone()),
            Scalar::Int(value) => AttributeValue::N(value.to_string()),
            Scalar::UInt(value) => AttributeValue::N(value.to_string()),
            Scalar::Float(value) => AttributeValue::N(value.to_string()),
            Scalar::Bool(value) => AttributeValue::Bool(*value),
            Scalar::Binary(bytes) => AttributeValue::B(bytes.clone()),
        }
    }

    fn decode(&self, value: &AttributeValue, expected: ScalarType) -> Result<Scalar, CodecError> {
        let invalid = |raw: &str| CodecError::InvalidNumber {
            expected,
            value: raw.to_string(),
        };

        match (expected, value) {
            (ScalarType::String, AttributeValue::S(s)) => Ok(Scalar::String(s.clone())),
            (ScalarType::Int, AttributeValue::N(n)) => {
                n.parse().map(Scalar::Int).map_err(|_| invalid(n))
            }
            (ScalarType::UInt, AttributeValue::N(n)) => {
                n.parse().map(Scalar::UInt).map_err(|_| invalid(n))
            }
            (ScalarType::Float, AttributeValue::N(n)) => {
                n.parse().map(Scalar::Float).map_err(|_| invalid(n))
            }
            (ScalarType::Bool, AttributeValue::Bool(b)) => Ok(Scalar::Bool(*b)),
            (ScalarType::Binary, AttributeValue::B(bytes)) => Ok(Scalar::Binary(bytes.clone())),
            (expected, other) => Err(CodecError::TypeMismatch {
                expected,
                found: other.kind(),
            }),
        }
    }

    fn key_string(&self, scalar: &Scalar) -> String {
        match scalar {
            Scalar::String(value) => value.clone(),
            Scalar::Int(value) => value.to_string(),
            Scalar::UInt(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Bool(value) => value.to_string(),
            Scalar::Binary(bytes) => STANDARD.encode(bytes),
        }
    }
}
