//! Attribute parsing for the Reflect derive macro.
//!
//! Fields accept `#[reflect(...)]` with any combination of:
//!
//! - `skip`: leave the field out of the descriptor
//! - `rename = "name"`: expose the member under another name
//! - `field`: describe the member as a plain field instead of a property
//! - `read_only`: reject writes through `Reflect::set`

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Lit, Meta, Result, Token,
};

/// Field-level attributes from `#[reflect(...)]`.
#[derive(Debug, Clone)]
pub struct ReflectAttr {
    /// Leave this field out of the descriptor.
    pub skip: bool,
    /// Member name (default: field name).
    pub rename: Option<String>,
    /// Describe the member as a field rather than a property.
    pub field: bool,
    /// Reject writes to this member.
    pub read_only: bool,
    /// The span for error reporting.
    pub span: Span,
}

impl Default for ReflectAttr {
    fn default() -> Self {
        ReflectAttr {
            skip: false,
            rename: None,
            field: false,
            read_only: false,
            span: Span::call_site(),
        }
    }
}

impl Parse for ReflectAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = ReflectAttr {
            span: input.span(),
            ..ReflectAttr::default()
        };

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("skip") => attr.skip = true,
                Meta::Path(p) if p.is_ident("field") => attr.field = true,
                Meta::Path(p) if p.is_ident("read_only") => attr.read_only = true,

                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: Lit::Str(s), ..
                    }) = &nv.value
                    {
                        attr.rename = Some(s.value());
                    } else {
                        return Err(Error::new(
                            nv.value.span(),
                            "rename must be a string literal",
                        ));
                    }
                }

                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown reflect attribute. Expected: skip, field, read_only, or rename = \"...\"",
                    ));
                }
            }
        }

        if attr.skip && (attr.rename.is_some() || attr.field || attr.read_only) {
            return Err(Error::new(
                attr.span,
                "skip cannot be combined with other reflect attributes",
            ));
        }

        Ok(attr)
    }
}

/// Extract `#[reflect(...)]` attributes from a field's attributes.
pub fn parse_reflect_attrs(attrs: &[Attribute]) -> Result<ReflectAttr> {
    for attr in attrs {
        if attr.path().is_ident("reflect") {
            return attr.parse_args::<ReflectAttr>();
        }
    }
    Ok(ReflectAttr::default())
}
