//! `#[orm(...)]` attribute parsing.

use heck::ToSnakeCase;
use syn::ext::IdentExt;
use syn::{DeriveInput, LitStr, Result};

/// Struct-level `#[orm(table = "...")]`.
pub(crate) fn table_name(input: &DeriveInput) -> Result<String> {
    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute, expected `table = \"...\"`"))
            }
        })?;
    }
    Ok(table.unwrap_or_else(|| input.ident.unraw().to_string().to_snake_case()))
}

/// Field-level `#[orm(id)]` / `#[orm(column = "...")]`.
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub column: String,
}

impl FieldAttr {
    pub(crate) fn parse(field: &syn::Field) -> Result<Self> {
        let mut is_id = false;
        let mut column = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    is_id = true;
                    Ok(())
                } else if meta.path.is_ident("column") {
                    let value: LitStr = meta.value()?.parse()?;
                    column = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported field attribute, expected `id` or `column = \"...\"`"))
                }
            })?;
        }

        let column = match column {
            Some(column) => column,
            None => match &field.ident {
                Some(ident) => ident.unraw().to_string(),
                None => return Err(syn::Error::new_spanned(field, "expected a named field")),
            },
        };
        Ok(Self { is_id, column })
    }
}
