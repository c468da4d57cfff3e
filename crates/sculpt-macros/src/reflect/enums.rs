//! Implementation of the `#[derive(ReflectEnum)]` macro.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, Data, DeriveInput, Error, Expr, ExprLit, Fields, Lit, Result};

/// Main implementation of the ReflectEnum derive macro.
///
/// Discriminants follow the Rust rules for unit enums: an explicit integer
/// discriminant is used as written, otherwise the previous one plus one.
pub fn reflect_enum_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let enum_name = &input.ident;
    let type_name = enum_name.to_string();

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "ReflectEnum cannot be derived for generic types",
        ));
    }

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => {
            return Err(Error::new(
                input.span(),
                "ReflectEnum can only be derived for enums",
            ))
        }
    };

    if variants.is_empty() {
        return Err(Error::new(
            input.span(),
            "ReflectEnum needs at least one variant",
        ));
    }

    let mut to_arms: Vec<TokenStream> = Vec::new();
    let mut from_arms: Vec<TokenStream> = Vec::new();
    let mut next: u32 = 0;

    for variant in variants.iter() {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new(
                variant.span(),
                "ReflectEnum only supports unit variants",
            ));
        }

        let discriminant = match &variant.discriminant {
            Some((_, expr)) => parse_discriminant(expr)?,
            None => next,
        };
        next = discriminant.wrapping_add(1);

        let ident = &variant.ident;
        to_arms.push(quote! { #enum_name::#ident => #discriminant, });
        from_arms.push(quote! {
            #discriminant => ::core::option::Option::Some(#enum_name::#ident),
        });
    }

    let expanded = quote! {
        impl ::sculpt::ReflectEnum for #enum_name {
            fn discriminant(&self) -> u32 {
                match self {
                    #(#to_arms)*
                }
            }

            fn from_discriminant(discriminant: u32) -> ::core::option::Option<Self> {
                match discriminant {
                    #(#from_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::sculpt::Typed for #enum_name {
            fn data_type() -> ::sculpt::DataType {
                ::sculpt::DataType::Enum
            }
        }

        impl ::sculpt::AsValue for #enum_name {
            fn as_value(&self) -> ::sculpt::Value<'_> {
                ::sculpt::Value::Enum(::sculpt::ReflectEnum::discriminant(self))
            }
        }

        impl ::sculpt::FromLiteral for #enum_name {
            fn from_literal(literal: ::sculpt::Literal) -> ::sculpt::Result<Self> {
                let found = match &literal {
                    ::sculpt::Literal::Enum(d) => <Self as ::sculpt::ReflectEnum>::from_discriminant(*d),
                    _ => ::core::option::Option::None,
                };
                found.ok_or_else(|| ::sculpt::SculptError::TypeMismatch {
                    context: "member assignment",
                    expected: ::std::string::String::from(#type_name),
                    actual: ::std::string::ToString::to_string(&literal),
                })
            }
        }

        impl ::core::convert::From<#enum_name> for ::sculpt::Literal {
            fn from(value: #enum_name) -> Self {
                ::sculpt::Literal::Enum(::sculpt::ReflectEnum::discriminant(&value))
            }
        }
    };

    Ok(expanded)
}

fn parse_discriminant(expr: &Expr) -> Result<u32> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(int), ..
        }) => int.base10_parse::<u32>(),
        other => Err(Error::new(
            other.span(),
            "ReflectEnum discriminants must be non-negative integer literals",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(tokens: &str) -> Result<String> {
        let input: DeriveInput = syn::parse_str(tokens)?;
        reflect_enum_derive_impl(input).map(|ts| ts.to_string())
    }

    #[test]
    fn test_discriminants_follow_declaration() {
        let out = expand("enum Status { Pending, Active = 5, Done }").unwrap();
        assert!(out.contains("Status :: Pending => 0u32"));
        assert!(out.contains("Status :: Active => 5u32"));
        assert!(out.contains("Status :: Done => 6u32"));
    }

    #[test]
    fn test_rejects_data_variants() {
        let err = expand("enum Shape { Circle(f64), Empty }").unwrap_err();
        assert!(err.to_string().contains("unit variants"));
    }

    #[test]
    fn test_rejects_structs() {
        assert!(expand("struct NotAnEnum { a: u8 }").is_err());
    }

    #[test]
    fn test_rejects_negative_discriminants() {
        assert!(expand("enum Level { Low = -1 }").is_err());
    }
}
