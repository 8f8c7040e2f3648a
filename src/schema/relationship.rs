use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use super::TableSchema;
use crate::document::{Document, MaterializeError};
use crate::entity::Entity;
use crate::error::MapperError;

/// How a relationship is laid out in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Children stored in the owner's partition.
    OneToMany,
    /// Symmetric link items, one in each endpoint's partition.
    ManyToMany,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::OneToMany => "one_to_many",
            RelationKind::ManyToMany => "many_to_many",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "one_to_many" => Some(RelationKind::OneToMany),
            "many_to_many" => Some(RelationKind::ManyToMany),
            _ => None,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessors for a collection navigation property `Vec<R>` on `E`.
///
/// Build one with [`nav!`](crate::nav):
///
/// ```ignore
/// builder.has_many_to_many(nav!(Movie, cast))
/// ```
pub struct Navigation<E, R> {
    get: Arc<dyn Fn(&E) -> &Vec<R> + Send + Sync>,
    get_mut: Arc<dyn Fn(&mut E) -> &mut Vec<R> + Send + Sync>,
}

impl<E, R> Navigation<E, R> {
    pub fn new<G, M>(get: G, get_mut: M) -> Self
    where
        G: Fn(&E) -> &Vec<R> + Send + Sync + 'static,
        M: Fn(&mut E) -> &mut Vec<R> + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            get_mut: Arc::new(get_mut),
        }
    }

    pub fn get<'a>(&self, entity: &'a E) -> &'a Vec<R> {
        (self.get)(entity)
    }

    pub fn get_mut<'a>(&self, entity: &'a mut E) -> &'a mut Vec<R> {
        (self.get_mut)(entity)
    }
}

impl<E, R> Clone for Navigation<E, R> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            get_mut: Arc::clone(&self.get_mut),
        }
    }
}

/// Builds a [`Navigation`] for a `Vec` field.
#[macro_export]
macro_rules! nav {
    ($owner:ty, $field:ident) => {
        $crate::Navigation::new(
            |owner: &$owner| &owner.$field,
            |owner: &mut $owner| &mut owner.$field,
        )
    };
}

/// One member of a navigation collection, resolved for item building.
#[derive(Debug, Clone)]
pub(crate) struct RelatedMember {
    pub partition_key: String,
    /// Sort key prefix for items written into the member's partition.
    pub scope: Option<String>,
    pub identity: String,
    pub document: Document,
}

type MembersFn<E> =
    Arc<dyn Fn(&E, &TableSchema) -> Result<Vec<RelatedMember>, MapperError> + Send + Sync>;
type AssignFn<E> =
    Arc<dyn Fn(&mut E, &TableSchema, &[&Document]) -> Result<(), MaterializeError> + Send + Sync>;

/// A declared relationship from `E` to another registered entity type.
pub struct Relationship<E> {
    kind: RelationKind,
    related_type: &'static str,
    related_id: TypeId,
    members: MembersFn<E>,
    assign: AssignFn<E>,
}

impl<E: Entity> Relationship<E> {
    pub(crate) fn new<R: Entity>(kind: RelationKind, navigation: Navigation<E, R>) -> Self {
        let read = navigation.clone();
        let members: MembersFn<E> = Arc::new(
            move |owner: &E, schema: &TableSchema| -> Result<Vec<RelatedMember>, MapperError> {
                let mapping = schema.mapping::<R>()?;
                let materializer = schema.materializer();
                read.get(owner)
                    .iter()
                    .map(|member| -> Result<RelatedMember, MapperError> {
                        Ok(RelatedMember {
                            partition_key: mapping.partition_key(schema, member)?,
                            scope: mapping.relation_scope(schema, member)?,
                            identity: mapping.identity(schema, member)?,
                            document: materializer.to_document(member)?,
                        })
                    })
                    .collect()
            },
        );

        let write = navigation;
        let assign: AssignFn<E> = Arc::new(
            move |owner: &mut E,
                  schema: &TableSchema,
                  items: &[&Document]|
                  -> Result<(), MaterializeError> {
                let materializer = schema.materializer();
                let members = items
                    .iter()
                    .map(|item| materializer.to_object::<R>(item, schema.reserved_attributes()))
                    .collect::<Result<Vec<R>, _>>()?;
                *write.get_mut(owner) = members;
                Ok(())
            },
        );

        Self {
            kind,
            related_type: R::ENTITY_TYPE,
            related_id: TypeId::of::<R>(),
            members,
            assign,
        }
    }
}

impl<E> Relationship<E> {
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn related_type(&self) -> &'static str {
        self.related_type
    }

    pub(crate) fn related_id(&self) -> TypeId {
        self.related_id
    }

    pub(crate) fn members(
        &self,
        owner: &E,
        schema: &TableSchema,
    ) -> Result<Vec<RelatedMember>, MapperError> {
        (self.members)(owner, schema)
    }

    /// Replace the navigation collection with objects decoded from `items`.
    pub(crate) fn assign(
        &self,
        owner: &mut E,
        schema: &TableSchema,
        items: &[&Document],
    ) -> Result<(), MaterializeError> {
        (self.assign)(owner, schema, items)
    }
}

impl<E> fmt::Debug for Relationship<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relationship")
            .field("kind", &self.kind)
            .field("related_type", &self.related_type)
            .finish()
    }
}
