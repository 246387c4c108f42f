//! Derive macro for the `compact_core::Compact` trait.
//!
//! # Example
//!
//! ```ignore
//! use compact_derive::Compact;
//!
//! #[derive(Compact)]
//! #[compact(type_name = "com.example.Person")]
//! struct Person {
//!     name: String,
//!     age: i32,
//!     #[compact(rename = "emailAddress")]
//!     email: Option<String>,
//!     #[compact(skip)]
//!     cached_hash: u64,
//! }
//! ```

extern crate proc_macro;

mod compact;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `compact_core::Compact` for a struct with named fields.
///
/// # Attributes
///
/// ## Struct-level
/// - `#[compact(type_name = "...")]` sets the Compact type name (defaults to
///   the Rust struct name).
///
/// ## Field-level
/// - `#[compact(rename = "...")]` overrides the field name in the schema.
/// - `#[compact(skip)]` leaves the field out; it is read back as `Default::default()`.
///
/// # Field Types
///
/// | Rust type | Field kind |
/// |-----------|------------|
/// | `bool`, `i8`, `i16`, `i32`, `i64`, `f32`, `f64` | the primitive kind |
/// | `Option<primitive>` | the nullable kind |
/// | `String`, `Decimal`, `NaiveTime`, `NaiveDate`, `NaiveDateTime`, `DateTime<FixedOffset>` | the variable-size kind |
/// | `GenericRecord` | `COMPACT` |
/// | any other type | `COMPACT`, through that type's registered serializer |
/// | `Vec<T>`, `Vec<Option<T>>` | the array kind of `T` |
///
/// Wrapping a non-primitive or an array in `Option` allows null values; without
/// it, reading a null value fails.
#[proc_macro_derive(Compact, attributes(compact))]
pub fn derive_compact(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    compact::derive_compact_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
