mod entity;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Entity)] derive macro
// ============================================================================

/// Derive macro for the `Entity` trait.
///
/// # Usage
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
///
/// - `#[entity(name = "...")]` sets the type discriminator written into
///   every item. If omitted, defaults to the struct name.
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input)
}
