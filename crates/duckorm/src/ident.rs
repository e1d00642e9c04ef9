//! Safe SQL identifier handling.
//!
//! Table, column, index, and alias names are validated against
//! `[A-Za-z_][A-Za-z0-9_]*` when a schema or projection is built, and always rendered
//! double-quoted, so a name can never change the shape of a statement.

use crate::error::{OrmError, OrmResult};
use std::fmt;

/// A validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// Parse and validate an identifier.
    pub fn parse(s: &str) -> OrmResult<Self> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }

    /// Validate without allocating.
    pub fn validate(s: &str) -> OrmResult<()> {
        let mut chars = s.chars();
        let Some(first) = chars.next() else {
            return Err(OrmError::invalid_schema("Identifier cannot be empty"));
        };
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(OrmError::invalid_schema(format!(
                "Invalid identifier '{s}': must start with a letter or '_'"
            )));
        }
        if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(OrmError::invalid_schema(format!(
                "Invalid identifier '{s}': unexpected character '{bad}'"
            )));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render as a quoted SQL identifier.
    pub fn to_sql(&self) -> String {
        quote(&self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Double-quote a name, escaping embedded quotes as `""`.
pub fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}
