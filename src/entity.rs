use serde::de::DeserializeOwned;
use serde::Serialize;

/// A type stored as items in the single table.
///
/// `ENTITY_TYPE` is written into every item as the type discriminator, which
/// is how a mixed query result is split back into typed objects. Use
/// `#[derive(Entity)]` to implement it:
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Entity)]
/// #[entity(name = "Movie")]
/// struct Movie {
///     id: String,
///     title: String,
///     #[serde(skip)]
///     cast: Vec<Actor>,
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const ENTITY_TYPE: &'static str;
}
