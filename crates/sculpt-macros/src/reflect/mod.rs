//! Derive macros for the sculpt reflection capability.
//!
//! `#[derive(Reflect)]` describes structs with named fields and
//! `#[derive(ReflectEnum)]` describes unit enums.

mod attrs;
mod derive;
mod enums;

pub use derive::reflect_derive_impl;
pub use enums::reflect_enum_derive_impl;

/// Convert a string to SCREAMING_SNAKE_CASE.
pub(crate) fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_was_lower = false;

    for c in s.chars() {
        if c.is_uppercase() {
            if prev_was_lower {
                result.push('_');
            }
            result.push(c);
            prev_was_lower = false;
        } else if c == '_' || c == '-' {
            result.push('_');
            prev_was_lower = false;
        } else {
            result.push(c.to_ascii_uppercase());
            prev_was_lower = true;
        }
    }

    result
}
