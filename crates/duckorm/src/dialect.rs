//! SQL dialect capabilities of a storage engine.

/// Placeholder syntax for bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `$1, $2, ...`
    Numbered,
    /// `?`
    Question,
}

/// How the engine assigns surrogate keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// `CREATE SEQUENCE` + `DEFAULT nextval('<seq>')` (DuckDB).
    Sequence,
    /// `GENERATED BY DEFAULT AS IDENTITY` (PostgreSQL).
    Identity,
    /// `AUTOINCREMENT` column keyword.
    AutoIncrement,
}

/// What a storage engine's SQL looks like and supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub placeholder: Placeholder,
    /// `INSERT ... VALUES (...), (...)`
    pub multi_row_insert: bool,
    /// `INSERT ... RETURNING <cols>`
    pub returning: bool,
    pub key_strategy: KeyStrategy,
    /// Most bound parameters one statement may carry, if the engine caps it.
    pub max_params: Option<usize>,
}

impl Dialect {
    pub const DUCKDB: Dialect = Dialect {
        placeholder: Placeholder::Numbered,
        multi_row_insert: true,
        returning: true,
        key_strategy: KeyStrategy::Sequence,
        max_params: None,
    };

    pub const POSTGRES: Dialect = Dialect {
        placeholder: Placeholder::Numbered,
        multi_row_insert: true,
        returning: true,
        key_strategy: KeyStrategy::Identity,
        max_params: Some(65_535),
    };

    /// Lowest common denominator: `?` placeholders, one row per INSERT, keys read
    /// back through [`Engine::last_insert_key`](crate::Engine::last_insert_key).
    pub const GENERIC: Dialect = Dialect {
        placeholder: Placeholder::Question,
        multi_row_insert: false,
        returning: false,
        key_strategy: KeyStrategy::AutoIncrement,
        max_params: Some(999),
    };

    /// Placeholder text for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self.placeholder {
            Placeholder::Numbered => format!("${index}"),
            Placeholder::Question => "?".to_string(),
        }
    }

    /// Rows of `width` values that fit in one statement, capped at `batch_size`.
    pub fn rows_per_statement(&self, width: usize, batch_size: usize) -> usize {
        let batch_size = batch_size.max(1);
        match self.max_params {
            Some(max) if width > 0 => batch_size.min((max / width).max(1)),
            _ => batch_size,
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::DUCKDB
    }
}
