use std::collections::HashMap;

use super::{Document, MaterializeError, MaterializeErrorKind};
use crate::entity::Entity;
use crate::error::MapperError;
use crate::key::{in_scope, ItemKey, RelationItem};
use crate::schema::{EntityMapping, TableSchema};
use crate::value::{AttributeValue, Scalar, ScalarType};

/// A root item materialized together with its relationship items.
#[derive(Debug)]
pub struct Grouped<E> {
    pub entity: E,
    pub key: ItemKey,
    /// Stored version, for versioned entity types.
    pub version: Option<u64>,
}

struct Member<'a> {
    item_type: String,
    sort_key: &'a str,
    item: &'a Document,
}

/// Split a mixed query result into objects of type `E`.
///
/// Every item whose type is `E` and which is not a relationship item becomes
/// one object. Relationship items owned by that object (same partition, and
/// under its sort key when `E` declares one) fill the matching navigation
/// collections. Each root item succeeds or fails on its own; an error for
/// one does not affect the others. Relationship items that cannot be read are
/// reported as failures too.
pub fn regroup<E: Entity>(
    schema: &TableSchema,
    items: &[Document],
) -> Result<Vec<Result<Grouped<E>, MaterializeError>>, MapperError> {
    let mapping = schema.mapping::<E>()?;
    let options = schema.options();

    let mut roots = Vec::new();
    let mut failures = Vec::new();
    let mut related: HashMap<&str, Vec<Member<'_>>> = HashMap::new();

    for item in items {
        match RelationItem::from_document(options, item) {
            Ok(Some(relation)) => {
                if relation.owner_type == E::ENTITY_TYPE {
                    if let (Some(partition), Some(sort_key)) = (
                        item.get(&options.partition_key_attribute)
                            .and_then(AttributeValue::as_s),
                        item.get(&options.sort_key_attribute)
                            .and_then(AttributeValue::as_s),
                    ) {
                        related.entry(partition).or_default().push(Member {
                            item_type: relation.item_type,
                            sort_key,
                            item,
                        });
                    }
                }
            }
            Ok(None) => {
                let is_root = item
                    .get(&options.type_attribute)
                    .and_then(AttributeValue::as_s)
                    == Some(E::ENTITY_TYPE);
                if is_root {
                    roots.push(item);
                }
            }
            Err(err) => failures.push(Err(MaterializeError::new(
                E::ENTITY_TYPE,
                MaterializeErrorKind::Decode(err.to_string()),
            ))),
        }
    }

    let mut grouped = Vec::with_capacity(roots.len());
    for item in roots {
        grouped.push(materialize_root::<E>(schema, mapping, item, &related));
    }
    grouped.extend(failures);
    Ok(grouped)
}

fn materialize_root<E: Entity>(
    schema: &TableSchema,
    mapping: &EntityMapping<E>,
    item: &Document,
    related: &HashMap<&str, Vec<Member<'_>>>,
) -> Result<Grouped<E>, MaterializeError> {
    let options = schema.options();
    let key = ItemKey::from_document(options, item).ok_or_else(|| {
        MaterializeError::new(
            E::ENTITY_TYPE,
            MaterializeErrorKind::Decode("item has no key attributes".to_string()),
        )
    })?;
    let fail = |err: MaterializeError| err.with_item(key.to_string());

    let mut entity: E = schema
        .materializer()
        .to_object(item, schema.reserved_attributes())
        .map_err(fail)?;

    let scope = if mapping.sort_parts().is_empty() {
        None
    } else {
        Some(key.sort_key.as_str())
    };
    if let Some(members) = related.get(key.partition_key.as_str()) {
        for relation in mapping.relationships() {
            let items: Vec<&Document> = members
                .iter()
                .filter(|member| member.item_type == relation.related_type())
                .filter(|member| in_scope(options.delimiter, scope, member.sort_key))
                .map(|member| member.item)
                .collect();
            relation.assign(&mut entity, schema, &items).map_err(fail)?;
        }
    }

    let version = if mapping.is_versioned() {
        match item.get(&options.version_attribute) {
            Some(value) => match schema.codec().decode(value, ScalarType::UInt) {
                Ok(Scalar::UInt(version)) => Some(version),
                Ok(_) => Some(0),
                Err(source) => {
                    return Err(fail(MaterializeError::new(
                        E::ENTITY_TYPE,
                        MaterializeErrorKind::Codec {
                            attribute: options.version_attribute.clone(),
                            source,
                        },
                    )))
                }
            },
            None => Some(0),
        }
    } else {
        None
    };

    Ok(Grouped {
        entity,
        version,
        key,
    })
}
