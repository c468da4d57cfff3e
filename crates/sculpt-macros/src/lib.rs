//! Derive macros for Sculpt.
//!
//! This crate implements the reflection capability the `sculpt` crate needs
//! to resolve members by name and read them at runtime.
//!
//! # Available Macros
//!
//! - [`Reflect`] - Describe a struct's members and read/write them by name
//! - [`ReflectEnum`] - Use a unit enum as a member type
//!
//! Both are re-exported by `sculpt`; depend on that crate rather than on this
//! one. For working examples, see `sculpt/tests/derive.rs`.

mod reflect;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives the reflection capability for a struct with named fields.
///
/// Generates implementations of `Entity`, `Reflect`, `Typed`, `AsValue` and
/// `FromLiteral`, plus a `SCREAMING_SNAKE_CASE` constant holding each member
/// name. Every reflected field's type must implement `Typed`, `AsValue` and
/// `FromLiteral`; this covers the primitive types, `String`, `Timestamp`,
/// `Option<T>`, other `Reflect` structs and `ReflectEnum` enums.
///
/// The type descriptor is built once, on first use, and shared afterwards,
/// so every call to `Entity::type_info()` returns the same `RecordType`.
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[reflect(skip)]` | Leave the field out entirely |
/// | `#[reflect(rename = "x")]` | Expose the member as `x` |
/// | `#[reflect(field)]` | Describe the member as a field, not a property |
/// | `#[reflect(read_only)]` | Reject writes through `Reflect::set` |
///
/// Members described as fields resolve, but cannot be used in property
/// paths.
///
/// # Limitations
///
/// Generic structs are rejected. A struct cannot contain itself, directly or
/// through `Option`.
///
/// # Example
///
/// ```ignore
/// use sculpt::{Entity, Reflect, Value};
///
/// #[derive(Reflect)]
/// struct Address {
///     city: String,
/// }
///
/// #[derive(Reflect)]
/// struct Person {
///     #[reflect(rename = "full_name")]
///     name: String,
///     age: Option<i32>,
///     address: Address,
///     #[reflect(skip)]
///     scratch: Vec<u8>,
/// }
///
/// // Generated constants
/// assert_eq!(Person::FULL_NAME, "full_name");
/// assert_eq!(Person::type_info().members().len(), 3);
/// ```
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn reflect_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reflect::reflect_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `ReflectEnum` for a unit enum.
///
/// Also implements `Typed`, `AsValue`, `FromLiteral` and
/// `From<Enum> for Literal`, so the enum can be a member type and a
/// criterion value. The enum must be `Copy`.
///
/// Discriminants are the ones Rust assigns: explicit integer literals are
/// honoured, other variants count up from the previous one.
///
/// # Example
///
/// ```ignore
/// use sculpt::{ReflectEnum, Literal};
///
/// #[derive(Clone, Copy, ReflectEnum)]
/// enum Status {
///     Pending,
///     Active = 10,
///     Done,
/// }
///
/// assert_eq!(Status::Done.discriminant(), 11);
/// assert_eq!(Literal::from(Status::Pending), Literal::Enum(0));
/// ```
#[proc_macro_derive(ReflectEnum)]
pub fn reflect_enum_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reflect::reflect_enum_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
