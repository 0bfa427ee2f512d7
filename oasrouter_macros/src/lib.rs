//! Derive macros for `oasrouter`.
//!
//! `#[derive(Reflect)]` describes the wire shape of a type so the router can
//! compare it with the OpenAPI schemas at startup. It reads the same
//! `#[serde(...)]` attributes serde uses (so JSON keys agree) plus the
//! `#[oas(...)]` attributes below:
//!
//! | attribute                  | applies to       | meaning                                   |
//! |----------------------------|------------------|-------------------------------------------|
//! | `#[oas(path = "id")]`      | struct field     | path parameter name (`"-"` excludes)      |
//! | `#[oas(query = "limit")]`  | struct field     | query parameter name (`"-"` excludes)     |
//! | `#[oas(status = 200)]`     | enum variant     | HTTP status of a response envelope arm    |
//!
//! `#[derive(Envelope)]` turns an enum whose variants carry `#[oas(status)]`
//! into a response envelope.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DataEnum, DeriveInput, Fields, FieldsNamed,
    Generics, Lit, LitStr, Visibility,
};

#[derive(Default)]
struct SerdeContainer {
    rename_all: Option<String>,
    untagged: bool,
    transparent: bool,
}

#[derive(Default)]
struct SerdeField {
    rename: Option<String>,
    skip: bool,
    skip_serializing: bool,
    skip_deserializing: bool,
    flatten: bool,
}

#[derive(Default)]
struct OasAttrs {
    path: Option<String>,
    query: Option<String>,
    status: Option<String>,
}

/// Consume the value of a nested meta item we do not care about.
fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream2 = content.parse()?;
    }
    Ok(())
}

/// Read either `key = "value"` or `key(serialize = "value", ...)`.
fn serialize_name(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        let lit: LitStr = meta.value()?.parse()?;
        return Ok(Some(lit.value()));
    }
    let mut out = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            let lit: LitStr = inner.value()?.parse()?;
            out = Some(lit.value());
        } else {
            skip_meta(&inner)?;
        }
        Ok(())
    })?;
    Ok(out)
}

fn parse_serde_container(attrs: &[Attribute]) -> syn::Result<SerdeContainer> {
    let mut out = SerdeContainer::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                out.rename_all = serialize_name(&meta)?;
            } else if meta.path.is_ident("untagged") {
                out.untagged = true;
            } else if meta.path.is_ident("transparent") {
                out.transparent = true;
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn parse_serde_field(attrs: &[Attribute]) -> syn::Result<SerdeField> {
    let mut out = SerdeField::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                out.rename = serialize_name(&meta)?;
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("skip_serializing") {
                out.skip_serializing = true;
            } else if meta.path.is_ident("skip_deserializing") {
                out.skip_deserializing = true;
            } else if meta.path.is_ident("flatten") {
                out.flatten = true;
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn parse_oas(attrs: &[Attribute]) -> syn::Result<OasAttrs> {
    let mut out = OasAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("oas")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("path") {
                let lit: LitStr = meta.value()?.parse()?;
                out.path = Some(lit.value());
            } else if meta.path.is_ident("query") {
                let lit: LitStr = meta.value()?.parse()?;
                out.query = Some(lit.value());
            } else if meta.path.is_ident("status") {
                // Kept verbatim: malformed statuses are reported by the router at
                // build time together with every other diagnostic.
                let lit: Lit = meta.value()?.parse()?;
                out.status = Some(match lit {
                    Lit::Int(i) => i.base10_digits().to_string(),
                    Lit::Str(s) => s.value(),
                    other => {
                        return Err(syn::Error::new(
                            other.span(),
                            "status must be an integer or string literal",
                        ))
                    }
                });
            } else {
                return Err(meta.error("unknown oas attribute, expected `path`, `query` or `status`"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Apply a serde `rename_all` rule to a snake_case field name.
fn apply_rename_all(ident: &str, rule: Option<&str>) -> String {
    let words = ident.split('_').filter(|w| !w.is_empty());
    match rule {
        Some("lowercase") => ident.to_lowercase(),
        Some("UPPERCASE") => ident.to_uppercase(),
        Some("PascalCase") => words.map(capitalize).collect(),
        Some("camelCase") => {
            let pascal: String = words.map(capitalize).collect();
            let mut chars = pascal.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        Some("SCREAMING_SNAKE_CASE") => ident.to_uppercase(),
        Some("kebab-case") => ident.replace('_', "-"),
        Some("SCREAMING-KEBAB-CASE") => ident.replace('_', "-").to_uppercase(),
        _ => ident.to_string(),
    }
}

fn opt_str(value: Option<String>) -> TokenStream2 {
    match value {
        Some(v) => quote!(::std::option::Option::Some(#v)),
        None => quote!(::std::option::Option::None),
    }
}

fn with_bounds(mut generics: Generics, bounds: &[syn::TypeParamBound]) -> Generics {
    for param in generics.type_params_mut() {
        for bound in bounds {
            param.bounds.push(bound.clone());
        }
    }
    generics
}

/// Derive `oasrouter::shape::Reflect`.
#[proc_macro_derive(Reflect, attributes(oas))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_reflect(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_reflect(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let container = parse_serde_container(&input.attrs)?;
    let generics = with_bounds(
        input.generics.clone(),
        &[parse_quote!(::oasrouter::shape::Reflect)],
    );
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) if container.transparent => transparent_shape(named)?,
            Fields::Named(named) => struct_shape(named, container.rename_all.as_deref())?,
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                let ty = &unnamed.unnamed[0].ty;
                quote!(<#ty as ::oasrouter::shape::Reflect>::shape())
            }
            Fields::Unnamed(_) => {
                quote!(::oasrouter::shape::Shape::Seq(::std::boxed::Box::new(
                    ::oasrouter::shape::Shape::Any
                )))
            }
            Fields::Unit => quote!(::oasrouter::shape::Shape::Nil),
        },
        Data::Enum(data) => enum_shape(data, &container)?,
        Data::Union(u) => {
            return Err(syn::Error::new(
                u.union_token.span(),
                "Reflect cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics ::oasrouter::shape::Reflect for #name #ty_generics #where_clause {
            fn shape() -> ::oasrouter::shape::Shape {
                #body
            }
        }
    })
}

fn transparent_shape(named: &FieldsNamed) -> syn::Result<TokenStream2> {
    for field in &named.named {
        let serde = parse_serde_field(&field.attrs)?;
        if !serde.skip {
            let ty = &field.ty;
            return Ok(quote!(<#ty as ::oasrouter::shape::Reflect>::shape()));
        }
    }
    Err(syn::Error::new(
        named.span(),
        "transparent struct has no serialized field",
    ))
}

fn struct_shape(named: &FieldsNamed, rename_all: Option<&str>) -> syn::Result<TokenStream2> {
    let mut fields = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ident_str = ident.to_string().trim_start_matches("r#").to_string();
        let serde = parse_serde_field(&field.attrs)?;
        let oas = parse_oas(&field.attrs)?;
        if oas.status.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "`status` belongs on enum variants of a response envelope",
            ));
        }

        let hidden = serde.skip || (serde.skip_serializing && serde.skip_deserializing);
        let json = if hidden {
            None
        } else {
            Some(
                serde
                    .rename
                    .unwrap_or_else(|| apply_rename_all(&ident_str, rename_all)),
            )
        };
        let json = opt_str(json);
        let flatten = serde.flatten;
        let public = matches!(field.vis, Visibility::Public(_));
        let path = opt_str(oas.path);
        let query = opt_str(oas.query);
        let ty = &field.ty;

        fields.push(quote! {
            ::oasrouter::shape::Field {
                ident: #ident_str,
                json: #json,
                flatten: #flatten,
                public: #public,
                path: #path,
                query: #query,
                shape: <#ty as ::oasrouter::shape::Reflect>::shape(),
            }
        });
    }

    Ok(quote! {
        ::oasrouter::shape::Shape::Struct(::oasrouter::shape::StructShape {
            name: ::std::any::type_name::<Self>(),
            fields: || ::std::vec![#(#fields),*],
        })
    })
}

fn enum_shape(data: &DataEnum, container: &SerdeContainer) -> syn::Result<TokenStream2> {
    let mut variants = Vec::with_capacity(data.variants.len());
    let mut all_unit = true;
    let mut any_status = false;

    for variant in &data.variants {
        let oas = parse_oas(&variant.attrs)?;
        any_status |= oas.status.is_some();
        let shape = match &variant.fields {
            Fields::Unit => quote!(::oasrouter::shape::Shape::Nil),
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                all_unit = false;
                let ty = &unnamed.unnamed[0].ty;
                quote!(<#ty as ::oasrouter::shape::Reflect>::shape())
            }
            _ => {
                return Err(syn::Error::new(
                    variant.span(),
                    "Reflect supports unit variants and single-field tuple variants only",
                ))
            }
        };
        let vname = variant.ident.to_string();
        let status = opt_str(oas.status);
        variants.push(quote! {
            ::oasrouter::shape::Variant {
                name: #vname,
                status: #status,
                shape: #shape,
            }
        });
    }

    if all_unit && !any_status && !container.untagged {
        // Plain C-like enums travel as their variant names.
        return Ok(quote!(::oasrouter::shape::Shape::Text(::std::any::type_name::<Self>())));
    }
    if !container.untagged && !any_status {
        return Err(syn::Error::new(
            data.enum_token.span(),
            "derive(Reflect) needs #[serde(untagged)] on enums carrying data, or #[oas(status)] on envelope variants",
        ));
    }

    Ok(quote! {
        ::oasrouter::shape::Shape::Union(::oasrouter::shape::UnionShape {
            name: ::std::any::type_name::<Self>(),
            variants: || ::std::vec![#(#variants),*],
        })
    })
}

/// Derive `oasrouter::typed::Envelope` for an enum of status-tagged variants.
#[proc_macro_derive(Envelope, attributes(oas))]
pub fn derive_envelope(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_envelope(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_envelope(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new(
            name.span(),
            "Envelope can only be derived for enums; each variant is one response",
        ));
    };

    let generics = with_bounds(
        input.generics.clone(),
        &[
            parse_quote!(::oasrouter::__private::serde::Serialize),
            parse_quote!(::oasrouter::shape::Reflect),
            parse_quote!(::std::marker::Send),
            parse_quote!('static),
        ],
    );
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut status_arms = Vec::new();
    let mut payload_arms = Vec::new();
    for variant in &data.variants {
        let ident = &variant.ident;
        let oas = parse_oas(&variant.attrs)?;
        let Some(status) = oas.status else {
            return Err(syn::Error::new(
                variant.span(),
                "every Envelope variant needs #[oas(status = ...)]",
            ));
        };
        match &variant.fields {
            Fields::Unit => {
                status_arms.push(quote! {
                    Self::#ident => ::oasrouter::shape::parse_status(#status).unwrap_or(0)
                });
                payload_arms.push(quote! {
                    Self::#ident => ::std::result::Result::Ok(::std::option::Option::None)
                });
            }
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                status_arms.push(quote! {
                    Self::#ident(..) => ::oasrouter::shape::parse_status(#status).unwrap_or(0)
                });
                payload_arms.push(quote! {
                    Self::#ident(value) => ::oasrouter::__private::serde_json::to_value(value)
                        .map(::std::option::Option::Some)
                });
            }
            _ => {
                return Err(syn::Error::new(
                    variant.span(),
                    "Envelope variants must be unit or single-field tuple variants",
                ))
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::oasrouter::typed::Envelope for #name #ty_generics #where_clause {
            fn status(&self) -> u16 {
                match self {
                    #(#status_arms,)*
                }
            }

            fn into_payload(
                self,
            ) -> ::std::result::Result<
                ::std::option::Option<::oasrouter::__private::serde_json::Value>,
                ::oasrouter::__private::serde_json::Error,
            > {
                match self {
                    #(#payload_arms,)*
                }
            }
        }
    })
}
