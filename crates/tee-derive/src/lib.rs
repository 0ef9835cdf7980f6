//! Derive macros for tee
//!
//! Provides `#[derive(Model)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod model;

/// Derive the `Model` schema registration for a struct.
///
/// # Example
///
/// ```ignore
/// use tee::Model;
///
/// #[derive(Model)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     id: Option<i64>,
///     username: String,
///     #[orm(column = "email_address")]
///     email: Option<String>,
/// }
/// ```
///
/// # Generated
///
/// - one `pub const` [`Field`] per attribute, named after it in
///   `UPPER_SNAKE_CASE` (`User::ID`, `User::USERNAME`, `User::EMAIL`)
/// - `impl tee::Model` with a static `Schema`
/// - `impl tee::FromRow`, reading each column by name
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name; defaults to the snake_case of the
///   struct name
/// - `#[orm(id)]` - Mark field as primary key (at most one)
/// - `#[orm(column = "name")]` - Map field to a different column name
///
/// [`Field`]: https://docs.rs/tee/latest/tee/model/struct.Field.html
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
