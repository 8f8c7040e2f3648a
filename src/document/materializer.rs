use serde_json::{Map, Number, Value};

use super::{Document, MaterializeError, MaterializeErrorKind};
use crate::entity::Entity;
use crate::value::{AttributeValue, Scalar, ScalarType, ValueCodec};

/// Converts between typed entities and stored items.
///
/// Entities go through their serde representation: every serialized field
/// becomes an attribute, nested structs become `M` values and sequences
/// become `L` values. Scalars are handed to the [`ValueCodec`].
#[derive(Clone, Copy)]
pub struct Materializer<'a> {
    codec: &'a dyn ValueCodec,
}

impl<'a> Materializer<'a> {
    pub fn new(codec: &'a dyn ValueCodec) -> Self {
        Self { codec }
    }

    /// Serialize an entity into its attribute map. Keys and bookkeeping
    /// attributes are added by the schema, not here.
    pub fn to_document<E: Entity>(&self, entity: &E) -> Result<Document, MaterializeError> {
        let value = serde_json::to_value(entity).map_err(|e| {
            MaterializeError::new(E::ENTITY_TYPE, MaterializeErrorKind::Encode(e.to_string()))
        })?;

        match value {
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(name, value)| (name, self.encode_value(value)))
                .collect()),
            _ => Err(MaterializeError::new(
                E::ENTITY_TYPE,
                MaterializeErrorKind::NotAnObject,
            )),
        }
    }

    /// Build an entity from an item, ignoring the `reserved` attributes.
    pub fn to_object<E: Entity>(
        &self,
        document: &Document,
        reserved: &[String],
    ) -> Result<E, MaterializeError> {
        let mut map = Map::new();
        for (name, value) in document {
            if reserved.iter().any(|r| r == name) {
                continue;
            }
            let decoded = self
                .decode_value(name, value)
                .map_err(|kind| MaterializeError::new(E::ENTITY_TYPE, kind))?;
            map.insert(name.clone(), decoded);
        }

        serde_json::from_value(Value::Object(map)).map_err(|e| {
            MaterializeError::new(E::ENTITY_TYPE, MaterializeErrorKind::Decode(e.to_string()))
        })
    }

    fn encode_value(&self, value: Value) -> AttributeValue {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => self.codec.encode(&Scalar::Bool(b)),
            Value::String(s) => self.codec.encode(&Scalar::String(s)),
            Value::Number(n) => {
                let scalar = if let Some(i) = n.as_i64() {
                    Scalar::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Scalar::UInt(u)
                } else {
                    Scalar::Float(n.as_f64().unwrap_or_default())
                };
                self.codec.encode(&scalar)
            }
            Value::Array(values) => {
                AttributeValue::L(values.into_iter().map(|v| self.encode_value(v)).collect())
            }
            Value::Object(map) => AttributeValue::M(
                map.into_iter()
                    .map(|(name, value)| (name, self.encode_value(value)))
                    .collect(),
            ),
        }
    }

    fn decode_value(
        &self,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<Value, MaterializeErrorKind> {
        let codec_error = |source| MaterializeErrorKind::Codec {
            attribute: attribute.to_string(),
            source,
        };

        match value {
            AttributeValue::Null => Ok(Value::Null),
            AttributeValue::S(_) => match self.codec.decode(value, ScalarType::String) {
                Ok(Scalar::String(s)) => Ok(Value::String(s)),
                Ok(_) => Ok(Value::Null),
                Err(e) => Err(codec_error(e)),
            },
            AttributeValue::Bool(_) => match self.codec.decode(value, ScalarType::Bool) {
                Ok(Scalar::Bool(b)) => Ok(Value::Bool(b)),
                Ok(_) => Ok(Value::Null),
                Err(e) => Err(codec_error(e)),
            },
            AttributeValue::N(_) => {
                if let Ok(Scalar::Int(i)) = self.codec.decode(value, ScalarType::Int) {
                    return Ok(Value::from(i));
                }
                if let Ok(Scalar::UInt(u)) = self.codec.decode(value, ScalarType::UInt) {
                    return Ok(Value::from(u));
                }
                match self.codec.decode(value, ScalarType::Float) {
                    Ok(Scalar::Float(f)) => Number::from_f64(f).map(Value::Number).ok_or_else(|| {
                        MaterializeErrorKind::Decode(format!(
                            "attribute {} holds a non-finite number",
                            attribute
                        ))
                    }),
                    Ok(_) => Ok(Value::Null),
                    Err(e) => Err(codec_error(e)),
                }
            }
            AttributeValue::B(_) => match self.codec.decode(value, ScalarType::Binary) {
                Ok(Scalar::Binary(bytes)) => {
                    Ok(Value::Array(bytes.into_iter().map(Value::from).collect()))
                }
                Ok(_) => Ok(Value::Null),
                Err(e) => Err(codec_error(e)),
            },
            AttributeValue::L(values) => values
                .iter()
                .map(|v| self.decode_value(attribute, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            AttributeValue::M(map) => {
                let mut object = Map::new();
                for (name, v) in map {
                    object.insert(name.clone(), self.decode_value(name, v)?);
                }
                Ok(Value::Object(object))
            }
        }
    }
}
