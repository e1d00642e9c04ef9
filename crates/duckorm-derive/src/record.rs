//! Record derive macro implementation.

mod attrs;

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

use crate::common::syn_types::option_inner;
use attrs::{FieldAttrs, field_attrs, struct_attrs};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let struct_attrs = struct_attrs(&input.attrs)?;
    let table = struct_attrs
        .table
        .unwrap_or_else(|| default_table_name(&name.to_string()));

    let mut columns = Vec::new();
    let mut field_defs = Vec::new();
    let mut payload_entries = Vec::new();
    let mut decoders = Vec::new();

    for (idx, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let attrs = field_attrs(field)?;
        let column = attrs.name.clone().unwrap_or_else(|| ident.to_string());

        if (attrs.auto_now || attrs.auto_now_add) && option_inner(ty).is_none() {
            return Err(syn::Error::new_spanned(
                ty,
                "auto_now/auto_now_add fields must be Option<_> so storage can fill them",
            ));
        }

        field_defs.push(field_def_tokens(&column, ty, &attrs));
        payload_entries.push(quote! {
            .with(#column, ::duckorm::FieldValue::to_value(&self.#ident))
        });
        decoders.push(quote! {
            #ident: row.get::<#ty>(#idx)?
        });
        columns.push(column);
    }

    let composite_key = struct_attrs.composite_key.map(|cols| {
        quote! { .composite_key([#(#cols),*]) }
    });

    Ok(quote! {
        impl ::duckorm::row::Record for #name {
            const TABLE: &'static str = #table;
            const COLUMNS: &'static [&'static str] = &[#(#columns),*];

            fn describe() -> ::duckorm::OrmResult<::duckorm::TableSchema> {
                ::duckorm::SchemaBuilder::new(#table)
                    #(.field(#field_defs))*
                    #composite_key
                    .build()
            }

            fn to_payload(&self) -> ::duckorm::Payload {
                ::duckorm::Payload::new()
                    #(#payload_entries)*
            }

            fn from_row(row: &::duckorm::Row) -> ::duckorm::OrmResult<Self> {
                row.expect_columns(Self::COLUMNS)?;
                ::std::result::Result::Ok(Self {
                    #(#decoders),*
                })
            }
        }

        ::duckorm::inventory::submit! {
            ::duckorm::registry::RecordRegistration {
                table: #table,
                describe: <#name as ::duckorm::row::Record>::describe,
            }
        }
    })
}

fn field_def_tokens(column: &str, ty: &syn::Type, attrs: &FieldAttrs) -> TokenStream {
    let nullable = match attrs.nullable {
        Some(explicit) => quote! { #explicit },
        None => quote! { <#ty as ::duckorm::FieldValue>::NULLABLE },
    };

    let mut chain = quote! {
        ::duckorm::FieldDef::new(#column, <#ty as ::duckorm::FieldValue>::FIELD_TYPE)
            .nullable(#nullable)
    };
    if let Some(default) = &attrs.default {
        chain.extend(quote! { .default_literal(#default) });
    }
    if attrs.unique {
        chain.extend(quote! { .unique() });
    }
    if attrs.index {
        chain.extend(quote! { .index() });
    }
    if attrs.primary_key {
        chain.extend(quote! { .primary_key() });
    }
    if let Some(size) = attrs.size {
        chain.extend(quote! { .size(#size) });
    }
    if let Some(precision) = attrs.precision {
        chain.extend(quote! { .precision(#precision) });
    }
    if let Some(scale) = attrs.scale {
        chain.extend(quote! { .scale(#scale) });
    }
    if let Some(check) = &attrs.check {
        chain.extend(quote! { .check(#check) });
    }
    if attrs.auto_now_add {
        chain.extend(quote! { .auto_now_add() });
    }
    if attrs.auto_now {
        chain.extend(quote! { .auto_now() });
    }
    chain
}

/// `Product` -> `products`, `OrderItem` -> `order_items`, `Category` -> `categories`.
pub(crate) fn default_table_name(type_name: &str) -> String {
    let snake = type_name.to_snake_case();
    if let Some(stem) = snake.strip_suffix('y')
        && !stem.ends_with(['a', 'e', 'i', 'o', 'u'])
    {
        return format!("{stem}ies");
    }
    if snake.ends_with('s') || snake.ends_with('x') || snake.ends_with("ch") || snake.ends_with("sh")
    {
        return format!("{snake}es");
    }
    format!("{snake}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn default_table_names() {
        assert_eq!(default_table_name("Product"), "products");
        assert_eq!(default_table_name("OrderItem"), "order_items");
        assert_eq!(default_table_name("Category"), "categories");
        assert_eq!(default_table_name("Key"), "keys");
        assert_eq!(default_table_name("Box"), "boxes");
    }

    #[test]
    fn expands_record_impl() {
        let input: DeriveInput = parse_quote! {
            struct Product {
                id: Option<i64>,
                #[orm(size = 50, unique)]
                code: String,
                #[orm(name = "label")]
                name: String,
            }
        };
        let out = expand(input).unwrap().to_string();
        assert!(out.contains("\"products\""));
        assert!(out.contains("\"label\""));
        assert!(!out.contains("\"name\""));
        assert!(out.contains("50u32"));
        assert!(out.contains("RecordRegistration"));
    }

    #[test]
    fn rejects_tuple_structs_and_generics() {
        let input: DeriveInput = parse_quote! { struct Pair(i64, i64); };
        assert!(expand(input).is_err());

        let input: DeriveInput = parse_quote! { struct Wrapper<T> { inner: T } };
        assert!(expand(input).is_err());
    }

    #[test]
    fn auto_timestamps_require_option() {
        let input: DeriveInput = parse_quote! {
            struct Event {
                #[orm(auto_now_add)]
                created_at: NaiveDateTime,
            }
        };
        assert!(expand(input).is_err());
    }
}
