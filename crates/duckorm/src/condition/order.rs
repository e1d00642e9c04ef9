use crate::error::{OrmError, OrmResult};
use crate::ident;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One ORDER BY item. The column may also name a projection alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }

    pub(crate) fn render(&self) -> String {
        format!("{} {}", ident::quote(&self.column), self.direction.as_sql())
    }
}

/// LIMIT / OFFSET.
///
/// Rendered as integer literals, never as bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// 1-based page of `per_page` rows.
    pub fn page(page: u64, per_page: u64) -> OrmResult<Self> {
        if page == 0 {
            return Err(OrmError::InvalidCondition(
                "page numbers start at 1".to_string(),
            ));
        }
        if per_page == 0 {
            return Err(OrmError::InvalidCondition(
                "per_page must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            limit: Some(per_page),
            offset: Some((page - 1).saturating_mul(per_page)),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }

    pub(crate) fn render_into(&self, sql: &mut String) {
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }
}
