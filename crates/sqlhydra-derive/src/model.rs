//! Model derive macro implementation.

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

use crate::attrs::{FieldKind, field_attr, table_name};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Model can only be derived for structs",
            ));
        }
    };

    let table = match table_name(&input)? {
        Some(table) => quote! { #table },
        None => {
            let snake = name.to_string().to_snake_case();
            quote! { ::sqlhydra::inflect::plural(#snake) }
        }
    };

    let mut field_defs = Vec::new();
    let mut extracts = Vec::new();
    let mut values = Vec::new();
    let mut has_id = false;

    for field in fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "Model fields must be named"))?;
        let field_name = ident.to_string();
        let attr = field_attr(field)?;
        let column = &attr.column;

        match &attr.kind {
            FieldKind::PrimaryKey | FieldKind::Column => {
                let role = if attr.kind == FieldKind::PrimaryKey {
                    if has_id {
                        return Err(syn::Error::new_spanned(
                            field,
                            "only one field can be marked #[orm(id)]",
                        ));
                    }
                    has_id = true;
                    quote! { ::sqlhydra::FieldRole::PrimaryKey }
                } else {
                    quote! { ::sqlhydra::FieldRole::Regular }
                };
                field_defs.push(quote! {
                    ::sqlhydra::FieldDef::new(#field_name, #column, #role)
                });
                extracts.push(quote! { #ident: record.try_get(#column)? });
                values.push(quote! {
                    (#column, ::sqlhydra::Value::from(::core::clone::Clone::clone(&self.#ident)))
                });
            }
            FieldKind::Relation(key) => {
                field_defs.push(quote! {
                    ::sqlhydra::FieldDef::new(#field_name, #key, ::sqlhydra::FieldRole::Relation)
                });
                extracts.push(quote! { #ident: record.try_get_related(#key)? });
            }
            FieldKind::Skip => {
                extracts.push(quote! { #ident: ::core::default::Default::default() });
            }
        }
    }

    Ok(quote! {
        impl ::sqlhydra::FromRecord for #name {
            fn from_record(record: &::sqlhydra::Record) -> ::sqlhydra::OrmResult<Self> {
                Ok(Self {
                    #(#extracts),*
                })
            }
        }

        impl ::sqlhydra::Model for #name {
            fn schema() -> &'static ::sqlhydra::ModelSchema {
                static SCHEMA: ::std::sync::OnceLock<::sqlhydra::ModelSchema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    ::sqlhydra::ModelSchema::new(#table, vec![#(#field_defs),*])
                })
            }

            fn to_values(&self) -> ::std::vec::Vec<(&'static str, ::sqlhydra::Value)> {
                vec![#(#values),*]
            }
        }
    })
}
