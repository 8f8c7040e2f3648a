use super::{scoped_sort_key, ItemKey, KeyError};
use crate::document::{Document, MaterializeError, MaterializeErrorKind};
use crate::entity::Entity;
use crate::error::MapperError;
use crate::schema::{EntityMapping, RelationKind, Relationship, TableOptions, TableSchema};
use crate::value::AttributeValue;

/// A relationship item recognised in a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationItem {
    pub kind: RelationKind,
    pub key: ItemKey,
    /// Entity type of the object stored in the item.
    pub item_type: String,
    /// Entity type whose navigation collection the item belongs to.
    pub owner_type: String,
}

impl RelationItem {
    /// `Ok(None)` for items that are not relationship items.
    pub fn from_document(
        options: &TableOptions,
        document: &Document,
    ) -> Result<Option<Self>, KeyError> {
        let kind = match document.get(&options.relation_attribute) {
            Some(value) => value.as_s().and_then(RelationKind::parse),
            None => return Ok(None),
        };
        let malformed = |reason: &str| KeyError::Malformed {
            key: ItemKey::from_document(options, document)
                .map(|key| key.to_string())
                .unwrap_or_default(),
            reason: reason.to_string(),
        };

        let kind = kind.ok_or_else(|| malformed("unknown relation kind"))?;
        let key = ItemKey::from_document(options, document)
            .ok_or_else(|| malformed("missing key attributes"))?;
        let item_type = document
            .get(&options.type_attribute)
            .and_then(AttributeValue::as_s)
            .ok_or_else(|| malformed("missing type attribute"))?;
        let owner_type = document
            .get(&options.owner_attribute)
            .and_then(AttributeValue::as_s)
            .ok_or_else(|| malformed("missing owner attribute"))?;

        Ok(Some(Self {
            kind,
            key,
            item_type: item_type.to_string(),
            owner_type: owner_type.to_string(),
        }))
    }
}

fn check_reserved(
    schema: &TableSchema,
    entity_type: &str,
    document: &Document,
) -> Result<(), MaterializeError> {
    match document
        .keys()
        .find(|name| schema.reserved_attributes().contains(*name))
    {
        Some(name) => Err(MaterializeError::new(
            entity_type,
            MaterializeErrorKind::ReservedAttribute(name.clone()),
        )),
        None => Ok(()),
    }
}

pub(crate) fn root_item<E: Entity>(
    schema: &TableSchema,
    mapping: &EntityMapping<E>,
    entity: &E,
) -> Result<Document, MapperError> {
    let options = schema.options();
    let mut item = schema.materializer().to_document(entity)?;
    check_reserved(schema, E::ENTITY_TYPE, &item)?;

    let key = mapping.item_key(schema, entity)?;
    item.insert(
        options.partition_key_attribute.clone(),
        AttributeValue::S(key.partition_key),
    );
    item.insert(
        options.sort_key_attribute.clone(),
        AttributeValue::S(key.sort_key),
    );
    for (attribute, value) in mapping.index_attributes(schema, entity)? {
        item.insert(attribute, AttributeValue::S(value));
    }
    item.insert(
        options.type_attribute.clone(),
        AttributeValue::from(E::ENTITY_TYPE),
    );

    Ok(item)
}

fn relation_item(
    schema: &TableSchema,
    kind: RelationKind,
    key: ItemKey,
    mut document: Document,
    item_type: &str,
    owner_type: &str,
) -> Result<Document, MaterializeError> {
    let options = schema.options();
    check_reserved(schema, item_type, &document)?;

    document.insert(
        options.partition_key_attribute.clone(),
        AttributeValue::S(key.partition_key),
    );
    document.insert(
        options.sort_key_attribute.clone(),
        AttributeValue::S(key.sort_key),
    );
    document.insert(options.type_attribute.clone(), AttributeValue::from(item_type));
    document.insert(
        options.relation_attribute.clone(),
        AttributeValue::from(kind.as_str()),
    );
    document.insert(
        options.owner_attribute.clone(),
        AttributeValue::from(owner_type),
    );
    Ok(document)
}

/// Items representing one relationship of `owner`.
///
/// One-to-many: one item per child in the owner's partition, sorted by the
/// child's identity. Many-to-many: two items per member, one in each
/// endpoint's partition, each carrying the opposite endpoint's attributes.
/// When the owner of a partition declares a sort key, the item's sort key
/// starts with it.
pub(crate) fn relation_items<E: Entity>(
    schema: &TableSchema,
    mapping: &EntityMapping<E>,
    owner: &E,
    relation: &Relationship<E>,
) -> Result<Vec<Document>, MapperError> {
    let delimiter = schema.options().delimiter;
    let owner_partition = mapping.partition_key(schema, owner)?;
    let owner_scope = mapping.relation_scope(schema, owner)?;
    let members = relation.members(owner, schema)?;
    let mut items = Vec::with_capacity(members.len() * 2);

    match relation.kind() {
        RelationKind::OneToMany => {
            for member in members {
                let sort_key = scoped_sort_key(delimiter, owner_scope.as_deref(), &member.identity);
                items.push(relation_item(
                    schema,
                    RelationKind::OneToMany,
                    ItemKey::new(owner_partition.clone(), sort_key),
                    member.document,
                    relation.related_type(),
                    E::ENTITY_TYPE,
                )?);
            }
        }
        RelationKind::ManyToMany => {
            let owner_identity = mapping.identity(schema, owner)?;
            let owner_document = schema.materializer().to_document(owner)?;
            for member in members {
                let forward = scoped_sort_key(delimiter, owner_scope.as_deref(), &member.identity);
                let backward = scoped_sort_key(delimiter, member.scope.as_deref(), &owner_identity);
                items.push(relation_item(
                    schema,
                    RelationKind::ManyToMany,
                    ItemKey::new(owner_partition.clone(), forward),
                    member.document,
                    relation.related_type(),
                    E::ENTITY_TYPE,
                )?);
                items.push(relation_item(
                    schema,
                    RelationKind::ManyToMany,
                    ItemKey::new(member.partition_key, backward),
                    owner_document.clone(),
                    E::ENTITY_TYPE,
                    relation.related_type(),
                )?);
            }
        }
    }

    Ok(items)
}
