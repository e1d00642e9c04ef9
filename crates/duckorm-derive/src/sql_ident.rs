//! Compile-time checks for table and column names given in `#[orm(...)]`.
//!
//! Mirrors `duckorm::Ident::validate` so a bad name fails at the derive site
//! instead of when the schema is first described.

use std::collections::HashSet;

use syn::{Error, LitStr, Result};

pub(crate) fn is_plain_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A single table or column name, e.g. `table = "order_lines"`.
pub(crate) fn parse_name(lit: &LitStr, attr: &str) -> Result<String> {
    let value = lit.value();
    let name = value.trim();
    if name.is_empty() {
        return Err(Error::new(lit.span(), format!("`{attr}` needs a name")));
    }
    if !is_plain_name(name) {
        return Err(Error::new(
            lit.span(),
            format!("`{attr} = \"{name}\"` is not a plain name: use letters, digits and '_', not starting with a digit"),
        ));
    }
    Ok(name.to_string())
}

/// The column list of `composite_key = "a, b"`: at least two distinct names.
pub(crate) fn parse_key_columns(lit: &LitStr) -> Result<Vec<String>> {
    let value = lit.value();
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !is_plain_name(part) {
            return Err(Error::new(
                lit.span(),
                format!("composite_key column '{part}' is not a plain name"),
            ));
        }
        if !seen.insert(part) {
            return Err(Error::new(
                lit.span(),
                format!("composite_key lists '{part}' twice"),
            ));
        }
        columns.push(part.to_string());
    }
    if columns.len() < 2 {
        return Err(Error::new(
            lit.span(),
            "composite_key needs at least two columns; use primary_key on the field for one",
        ));
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::Span;

    fn lit(s: &str) -> LitStr {
        LitStr::new(s, Span::call_site())
    }

    #[test]
    fn plain_names() {
        assert!(is_plain_name("order_lines"));
        assert!(is_plain_name("_x1"));
        assert!(!is_plain_name("1x"));
        assert!(!is_plain_name("a-b"));
        assert!(!is_plain_name("public.items"));
        assert!(!is_plain_name(""));
    }

    #[test]
    fn names_are_trimmed_and_checked() {
        assert_eq!(parse_name(&lit(" sales "), "table").unwrap(), "sales");
        assert!(parse_name(&lit(""), "table").is_err());
        assert!(parse_name(&lit("drop table"), "name").is_err());
    }

    #[test]
    fn key_columns() {
        assert_eq!(
            parse_key_columns(&lit("order_id, line")).unwrap(),
            vec!["order_id", "line"]
        );
        assert!(parse_key_columns(&lit("a, a")).is_err());
        assert!(parse_key_columns(&lit("a")).is_err());
        assert!(parse_key_columns(&lit(" , ")).is_err());
        assert!(parse_key_columns(&lit("a, b-c")).is_err());
    }
}
