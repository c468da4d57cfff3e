//! Implementation of the `#[derive(Reflect)]` macro.
//!
//! Generates `Entity`, `Reflect`, `Typed`, `AsValue` and `FromLiteral` for a
//! struct with named fields, plus a member name constant per reflected field.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{spanned::Spanned, Data, DeriveInput, Error, Fields, Result};

use super::attrs::parse_reflect_attrs;
use super::to_screaming_snake_case;

/// Main implementation of the Reflect derive macro.
pub fn reflect_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let type_name = struct_name.to_string();

    // The descriptor lives in a per-type static, which generic items cannot have.
    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Reflect cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Reflect can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Reflect can only be derived for structs; use ReflectEnum for unit enums",
            ))
        }
    };

    let mut members: Vec<TokenStream> = Vec::new();
    let mut get_arms: Vec<TokenStream> = Vec::new();
    let mut set_arms: Vec<TokenStream> = Vec::new();
    let mut constants: Vec<TokenStream> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;
        let attrs = parse_reflect_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let member_name = attrs.rename.unwrap_or_else(|| field_name.to_string());
        if seen.contains(&member_name) {
            return Err(Error::new(
                field.span(),
                format!("duplicate member name `{}`", member_name),
            ));
        }
        seen.push(member_name.clone());

        let ty = &field.ty;
        let const_name = format_ident!("{}", to_screaming_snake_case(&member_name));
        constants.push(quote! {
            /// Member name constant for building paths.
            pub const #const_name: &'static str = #member_name;
        });

        let constructor = if attrs.field {
            quote! { field }
        } else {
            quote! { property }
        };
        let read_only = attrs.read_only.then(|| quote! { .read_only() });
        members.push(quote! {
            .member(
                ::sculpt::MemberInfo::#constructor(
                    #member_name,
                    <#ty as ::sculpt::Typed>::data_type(),
                )
                #read_only
            )
        });

        get_arms.push(quote! {
            #member_name => ::core::option::Option::Some(::sculpt::AsValue::as_value(&self.#field_name)),
        });

        if attrs.read_only {
            set_arms.push(quote! {
                #member_name => ::core::result::Result::Err(::sculpt::SculptError::InvalidArgument {
                    name: "member",
                    reason: ::std::format!("`{}.{}` is read-only", #type_name, #member_name),
                }),
            });
        } else {
            set_arms.push(quote! {
                #member_name => {
                    self.#field_name = ::sculpt::FromLiteral::from_literal(value)?;
                    ::core::result::Result::Ok(())
                }
            });
        }
    }

    let expanded = quote! {
        impl #struct_name {
            #(#constants)*
        }

        impl ::sculpt::Entity for #struct_name {
            fn type_info() -> ::sculpt::RecordType {
                static INFO: ::sculpt::__private::OnceCell<::sculpt::RecordType> =
                    ::sculpt::__private::OnceCell::new();
                INFO.get_or_init(|| {
                    ::sculpt::TypeInfo::builder(#type_name)
                        #(#members)*
                        .build()
                })
                .clone()
            }
        }

        impl ::sculpt::Reflect for #struct_name {
            fn record_type(&self) -> ::sculpt::RecordType {
                <Self as ::sculpt::Entity>::type_info()
            }

            fn get(&self, member: &str) -> ::core::option::Option<::sculpt::Value<'_>> {
                match member {
                    #(#get_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set(&mut self, member: &str, value: ::sculpt::Literal) -> ::sculpt::Result<()> {
                match member {
                    #(#set_arms)*
                    other => ::core::result::Result::Err(::sculpt::SculptError::MemberNotFound {
                        type_name: ::std::string::String::from(#type_name),
                        member: ::std::string::String::from(other),
                    }),
                }
            }
        }

        impl ::sculpt::Typed for #struct_name {
            fn data_type() -> ::sculpt::DataType {
                ::sculpt::DataType::Record(<Self as ::sculpt::Entity>::type_info())
            }
        }

        impl ::sculpt::AsValue for #struct_name {
            fn as_value(&self) -> ::sculpt::Value<'_> {
                ::sculpt::Value::Record(self)
            }
        }

        impl ::sculpt::FromLiteral for #struct_name {
            fn from_literal(literal: ::sculpt::Literal) -> ::sculpt::Result<Self> {
                ::core::result::Result::Err(::sculpt::SculptError::TypeMismatch {
                    context: "member assignment",
                    expected: ::std::string::String::from(#type_name),
                    actual: ::std::string::ToString::to_string(&literal),
                })
            }
        }
    };

    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(tokens: &str) -> Result<String> {
        let input: DeriveInput = syn::parse_str(tokens)?;
        reflect_derive_impl(input).map(|ts| ts.to_string())
    }

    #[test]
    fn test_generates_constants_and_members() {
        let out = expand(
            r#"struct Person {
                name: String,
                #[reflect(rename = "years")]
                age: Option<i32>,
                #[reflect(skip)]
                cache: Vec<u8>,
            }"#,
        )
        .unwrap();
        assert!(out.contains("pub const NAME"));
        assert!(out.contains("pub const YEARS"));
        assert!(!out.contains("CACHE"));
        assert!(out.contains("\"years\""));
    }

    #[test]
    fn test_rejects_generics() {
        let err = expand("struct Wrapper<T> { inner: T }").unwrap_err();
        assert!(err.to_string().contains("generic"));
    }

    #[test]
    fn test_rejects_tuple_structs_and_enums() {
        assert!(expand("struct Pair(i32, i32);").is_err());
        assert!(expand("enum Kind { A, B }").is_err());
    }

    #[test]
    fn test_rejects_duplicate_member_names() {
        let err = expand(
            r#"struct Clash {
                name: String,
                #[reflect(rename = "name")]
                label: String,
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate member name"));
    }

    #[test]
    fn test_read_only_members_reject_writes() {
        let out = expand(
            r#"struct Account {
                #[reflect(read_only)]
                id: u64,
            }"#,
        )
        .unwrap();
        assert!(out.contains("read_only ()"));
        assert!(out.contains("is read-only"));
    }
}
