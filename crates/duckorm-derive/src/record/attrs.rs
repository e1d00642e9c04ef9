//! Attribute parsing for Record derive macro.
//!
//! Struct level: `#[orm(table = "...", composite_key = "a, b")]`.
//! Field level: `#[orm(name = "...", size = 50, unique, primary_key, ...)]`.

use syn::Result;

use crate::sql_ident::{parse_key_columns, parse_name};

#[derive(Default)]
pub(super) struct StructAttrs {
    pub(super) table: Option<String>,
    pub(super) composite_key: Option<Vec<String>>,
}

impl syn::parse::Parse for StructAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs = StructAttrs::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;

            match ident.to_string().as_str() {
                "table" => attrs.table = Some(parse_name(&value, "table")?),
                "composite_key" => {
                    attrs.composite_key = Some(parse_key_columns(&value)?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown struct attribute '{other}'"),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attrs)
    }
}

/// Options of one record field.
#[derive(Default, Debug)]
pub(super) struct FieldAttrs {
    pub(super) name: Option<String>,
    /// `Some(true)` for `nullable`, `Some(false)` for `not_null`.
    pub(super) nullable: Option<bool>,
    pub(super) default: Option<String>,
    pub(super) unique: bool,
    pub(super) index: bool,
    pub(super) primary_key: bool,
    pub(super) size: Option<u32>,
    pub(super) precision: Option<u32>,
    pub(super) scale: Option<u32>,
    pub(super) check: Option<String>,
    pub(super) auto_now_add: bool,
    pub(super) auto_now: bool,
}

impl syn::parse::Parse for FieldAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs = FieldAttrs::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let key = ident.to_string();

            if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                match key.as_str() {
                    "name" => {
                        let value: syn::LitStr = input.parse()?;
                        attrs.name = Some(parse_name(&value, "name")?);
                    }
                    "default" => {
                        let value: syn::LitStr = input.parse()?;
                        attrs.default = Some(value.value());
                    }
                    "check" => {
                        let value: syn::LitStr = input.parse()?;
                        attrs.check = Some(value.value());
                    }
                    "size" => attrs.size = Some(parse_u32(input)?),
                    "precision" => attrs.precision = Some(parse_u32(input)?),
                    "scale" => attrs.scale = Some(parse_u32(input)?),
                    other => {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("unknown field attribute '{other}'"),
                        ));
                    }
                }
            } else {
                match key.as_str() {
                    "nullable" => attrs.nullable = Some(true),
                    "not_null" => attrs.nullable = Some(false),
                    "unique" => attrs.unique = true,
                    "index" => attrs.index = true,
                    "primary_key" => attrs.primary_key = true,
                    "auto_now_add" => attrs.auto_now_add = true,
                    "auto_now" => attrs.auto_now = true,
                    other => {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("unknown field attribute '{other}'"),
                        ));
                    }
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attrs)
    }
}

/// Accepts `50` or `"50"`.
fn parse_u32(input: syn::parse::ParseStream) -> Result<u32> {
    if input.peek(syn::LitStr) {
        let lit: syn::LitStr = input.parse()?;
        return lit
            .value()
            .trim()
            .parse()
            .map_err(|_| syn::Error::new(lit.span(), "expected a non-negative integer"));
    }
    let lit: syn::LitInt = input.parse()?;
    lit.base10_parse()
}

/// Merge every `#[orm(...)]` on the struct.
pub(super) fn struct_attrs(attrs: &[syn::Attribute]) -> Result<StructAttrs> {
    let mut merged = StructAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed: StructAttrs = attr.parse_args()?;
        if parsed.table.is_some() {
            merged.table = parsed.table;
        }
        if parsed.composite_key.is_some() {
            merged.composite_key = parsed.composite_key;
        }
    }
    Ok(merged)
}

/// Parse the `#[orm(...)]` attributes of a field; later attributes win.
pub(super) fn field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut merged = FieldAttrs::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed: FieldAttrs = attr.parse_args()?;
        merged.merge(parsed);
    }
    Ok(merged)
}

impl FieldAttrs {
    fn merge(&mut self, other: FieldAttrs) {
        self.name = other.name.or(self.name.take());
        self.nullable = other.nullable.or(self.nullable);
        self.default = other.default.or(self.default.take());
        self.unique |= other.unique;
        self.index |= other.index;
        self.primary_key |= other.primary_key;
        self.size = other.size.or(self.size);
        self.precision = other.precision.or(self.precision);
        self.scale = other.scale.or(self.scale);
        self.check = other.check.or(self.check.take());
        self.auto_now_add |= other.auto_now_add;
        self.auto_now |= other.auto_now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn parses_field_options() {
        let field: syn::Field = parse_quote! {
            #[orm(size = 50, unique, default = "n/a", nullable)]
            code: Option<String>
        };
        let attrs = field_attrs(&field).unwrap();
        assert_eq!(attrs.size, Some(50));
        assert!(attrs.unique);
        assert_eq!(attrs.default.as_deref(), Some("n/a"));
        assert_eq!(attrs.nullable, Some(true));
        assert!(!attrs.primary_key);
    }

    #[test]
    fn later_attributes_win() {
        let field: syn::Field = parse_quote! {
            #[orm(nullable)]
            #[orm(not_null, precision = "10", scale = 2)]
            price: Decimal
        };
        let attrs = field_attrs(&field).unwrap();
        assert_eq!(attrs.nullable, Some(false));
        assert_eq!(attrs.precision, Some(10));
        assert_eq!(attrs.scale, Some(2));
    }

    #[test]
    fn rejects_unknown_and_invalid_options() {
        let field: syn::Field = parse_quote! {
            #[orm(colour = "red")]
            a: i64
        };
        assert!(field_attrs(&field).is_err());

        let field: syn::Field = parse_quote! {
            #[orm(name = "bad name")]
            a: i64
        };
        assert!(field_attrs(&field).is_err());

        let field: syn::Field = parse_quote! {
            #[orm(size = -1)]
            a: String
        };
        assert!(field_attrs(&field).is_err());
    }

    #[test]
    fn parses_struct_options() {
        let attrs: Vec<syn::Attribute> =
            vec![parse_quote!(#[orm(table = "line_items", composite_key = "order_id, line")])];
        let parsed = struct_attrs(&attrs).unwrap();
        assert_eq!(parsed.table.as_deref(), Some("line_items"));
        assert_eq!(
            parsed.composite_key,
            Some(vec!["order_id".to_string(), "line".to_string()])
        );
    }
}
