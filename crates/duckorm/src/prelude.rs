//! Convenient imports for typical `duckorm` usage.
//!
//! ```ignore
//! use duckorm::prelude::*;
//! ```

pub use crate::{
    AggregateExpr, AggregateQuery, Condition, Engine, Find, InsertResult, OrderBy, OrmError,
    OrmResult, Pagination, Payload, Record, Row, Session, SessionConfig, Value,
};

#[cfg(feature = "duckdb")]
pub use crate::DuckDbEngine;
