use std::fmt;

/// A primitive value that may contribute to a key or a stored attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Binary(Vec<u8>),
}

/// The type a caller expects when decoding a native value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Int,
    UInt,
    Float,
    Bool,
    Binary,
}

impl Scalar {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::String(_) => ScalarType::String,
            Scalar::Int(_) => ScalarType::Int,
            Scalar::UInt(_) => ScalarType::UInt,
            Scalar::Float(_) => ScalarType::Float,
            Scalar::Bool(_) => ScalarType::Bool,
            Scalar::Binary(_) => ScalarType::Binary,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::String => "string",
            ScalarType::Int => "signed integer",
            ScalarType::UInt => "unsigned integer",
            ScalarType::Float => "float",
            ScalarType::Bool => "boolean",
            ScalarType::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// Conversion used by key selectors.
///
/// `None` means the selected path is absent (for example an unset nested
/// object), which the key codec reports as a resolution error.
pub trait IntoKeyValue {
    fn into_key_value(self) -> Option<Scalar>;
}

impl IntoKeyValue for Scalar {
    fn into_key_value(self) -> Option<Scalar> {
        Some(self)
    }
}

impl IntoKeyValue for String {
    fn into_key_value(self) -> Option<Scalar> {
        Some(Scalar::String(self))
    }
}

impl IntoKeyValue for &'static str {
    fn into_key_value(self) -> Option<Scalar> {
        Some(Scalar::String(self.to_string()))
    }
}

impl IntoKeyValue for Vec<u8> {
    fn into_key_value(self) -> Option<Scalar> {
        Some(Scalar::Binary(self))
    }
}

impl IntoKeyValue for bool {
    fn into_key_value(self) -> Option<Scalar> {
        Some(Scalar::Bool(self))
    }
}

impl IntoKeyValue for f64 {
    fn into_key_value(self) -> Option<Scalar> {
        Some(Scalar::Float(self))
    }
}

macro_rules! signed_key_value {
    ($($ty:ty),*) => {
        $(impl IntoKeyValue for $ty {
            fn into_key_value(self) -> Option<Scalar> {
                Some(Scalar::Int(i64::from(self)))
            }
        })*
    };
}

macro_rules! unsigned_key_value {
    ($($ty:ty),*) => {
        $(impl IntoKeyValue for $ty {
            fn into_key_value(self) -> Option<Scalar> {
                Some(Scalar::UInt(u64::from(self)))
            }
        })*
    };
}

signed_key_value!(i8, i16, i32, i64);
unsigned_key_value!(u8, u16, u32, u64);

impl<T: IntoKeyValue> IntoKeyValue for Option<T> {
    fn into_key_value(self) -> Option<Scalar> {
        self.and_then(IntoKeyValue::into_key_value)
    }
}
