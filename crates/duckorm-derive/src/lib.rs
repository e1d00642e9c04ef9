//! Derive macros for duckorm
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod record;
mod sql_ident;

/// Derive `Record` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use duckorm::Record;
///
/// #[derive(Record)]
/// #[orm(table = "products")]
/// struct Product {
///     id: Option<i64>,
///     #[orm(size = 50, unique)]
///     code: String,
///     name: String,
///     price: i64,
///     #[orm(default = "true")]
///     in_stock: Option<bool>,
/// }
/// ```
///
/// # Generated
///
/// - `TABLE` and `COLUMNS` constants
/// - `describe()` building the table schema from the field types and options
/// - `to_payload()` / `from_row()` conversions
/// - a registry entry used by `Session::migrate_registered`
///
/// # Attributes
///
/// Struct level:
/// - `#[orm(table = "name")]` - Table name (default: snake_case plural of the type name)
/// - `#[orm(composite_key = "a, b")]` - Composite primary key
///
/// Field level:
/// - `name = "col"` - Column name (default: field name)
/// - `nullable` / `not_null` - Override nullability (default: `Option<_>` is nullable)
/// - `default = "literal"` - Column default, parsed as the field type
/// - `primary_key`, `unique`, `index`
/// - `size = 50` - VARCHAR length
/// - `precision = 10`, `scale = 2` - DECIMAL precision/scale
/// - `check = "expr"` - Raw CHECK constraint
/// - `auto_now_add` / `auto_now` - Stamp the current time on insert / every write
///
/// Field types must implement `duckorm::FieldValue`.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
