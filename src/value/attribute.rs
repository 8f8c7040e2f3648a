use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A value in the store's native representation.
///
/// Numbers are carried as their decimal string, the way wide-column stores
/// transmit them, so no precision is lost between encode and decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
    L(Vec<AttributeValue>),
    M(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttributeValue::N(value) => Some(value),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null => "NULL",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::N(value.to_string())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::S(value) => write!(f, "{:?}", value),
            AttributeValue::N(value) => write!(f, "{}", value),
            AttributeValue::B(bytes) => write!(f, "<{} bytes>", bytes.len()),
            AttributeValue::Bool(value) => write!(f, "{}", value),
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::L(values) => write!(f, "[{} values]", values.len()),
            AttributeValue::M(map) => write!(f, "{{{} attributes}}", map.len()),
        }
    }
}
