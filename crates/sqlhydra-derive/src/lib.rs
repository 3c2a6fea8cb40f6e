//! Derive macros for sqlhydra
//!
//! Provides `#[derive(Model)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod model;

/// Derive `Model` and `FromRecord` for a struct.
///
/// # Example
///
/// ```ignore
/// use sqlhydra::Model;
///
/// #[derive(Model)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     email: Option<String>,
///     #[orm(relation)]
///     posts: Vec<Post>,
///     #[orm(skip)]
///     cached_score: u32,
/// }
/// ```
///
/// # Generated
///
/// - `Model::schema()` - field → column → role descriptor, built once and cached
/// - `Model::to_values()` - stored column values in declaration order
/// - `FromRecord::from_record()` - columns by name, relations by attachment key
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (default: plural snake_case of the struct name)
/// - `#[orm(id)]` - Mark field as primary key
/// - `#[orm(column = "name")]` - Map field to different column name
/// - `#[orm(relation)]` / `#[orm(relation = "key")]` - Fill from an eager-loaded relation
///   (`Vec<T>` or `Option<T>`); the key defaults to the field name
/// - `#[orm(skip)]` - Not mapped; initialized with `Default`
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
