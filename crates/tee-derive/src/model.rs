//! Model derive macro implementation

use heck::ToShoutySnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

use crate::attrs::{FieldAttr, table_name};

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

    let table = table_name(&input)?;

    let mut consts = Vec::new();
    let mut const_names = Vec::new();
    let mut extracts = Vec::new();
    let mut record_entries = Vec::new();
    let mut primary_key: Option<String> = None;

    for field in fields {
        let attr = FieldAttr::parse(field)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let column = &attr.column;

        if attr.is_id {
            if primary_key.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "Model supports a single #[orm(id)] field",
                ));
            }
            primary_key = Some(column.clone());
        }

        let const_name = format_ident!("{}", ident.unraw().to_string().to_shouty_snake_case());
        consts.push(quote! {
            pub const #const_name: ::tee::Field =
                ::tee::Field::new(#column, <#ty as ::tee::SqlKind>::KIND);
        });
        const_names.push(const_name);

        extracts.push(quote! {
            #ident: row.get_as(#column)?
        });
        record_entries.push(quote! {
            if let ::std::option::Option::Some(value) = ::tee::ToValue::to_value(&self.#ident) {
                record.insert(#column, value);
            }
        });
    }

    let primary_key = match primary_key {
        Some(pk) => quote! { ::std::option::Option::Some(#pk) },
        None => quote! { ::std::option::Option::None },
    };

    Ok(quote! {
        impl #name {
            #(#consts)*
        }

        impl ::tee::FromRow for #name {
            fn from_row(row: &::tee::Row) -> ::tee::OrmResult<Self> {
                ::std::result::Result::Ok(Self {
                    #(#extracts),*
                })
            }
        }

        impl ::tee::Model for #name {
            fn schema() -> &'static ::tee::Schema {
                static SCHEMA: ::tee::Schema = ::tee::Schema::new(
                    #table,
                    &[#(#name::#const_names),*],
                    #primary_key,
                );
                &SCHEMA
            }

            fn to_record(&self) -> ::tee::Record {
                let mut record = ::tee::Record::new();
                #(#record_entries)*
                record
            }
        }
    })
}
