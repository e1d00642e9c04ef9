//! # duckorm
//!
//! A schema-first data-mapping layer for embedded analytical databases.
//!
//! ## Features
//!
//! - **Schema from records**: `#[derive(Record)]` describes a table; the same record
//!   always yields the same [`TableSchema`]
//! - **Additive migrations**: [`Session::migrate`] creates missing tables, columns and
//!   indexes, and refuses anything it cannot reconcile without data loss
//! - **Parameterized conditions**: values are always bound, identifiers always quoted
//! - **Safe defaults**: UPDATE / DELETE without a condition is rejected unless
//!   explicitly allowed
//! - **Batch inserts**: multi-row statements with storage-assigned keys returned in
//!   input order
//! - **Pluggable storage**: anything implementing [`Engine`]; DuckDB ships behind the
//!   `duckdb` feature
//!
//! ## Example
//!
//! ```ignore
//! use duckorm::prelude::*;
//!
//! #[derive(Debug, Record)]
//! struct Product {
//!     id: Option<i64>,
//!     #[orm(size = 50, unique)]
//!     code: String,
//!     name: String,
//!     price: i64,
//!     #[orm(default = "true")]
//!     in_stock: Option<bool>,
//! }
//!
//! let session = Session::new(DuckDbEngine::open_in_memory()?);
//! session.auto_migrate::<Product>()?;
//!
//! session.insert_many(&products)?;
//!
//! let cheap: Vec<Product> = session.find(
//!     Find::filter(Condition::lt("price", 1000)).order_by(OrderBy::asc("price")),
//! )?;
//!
//! let stats = session.aggregate::<Product>(
//!     AggregateQuery::new()
//!         .select("in_stock")
//!         .select(AggregateExpr::avg("price"))
//!         .group_by("in_stock"),
//! )?;
//! ```

extern crate self as duckorm;

pub mod condition;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod ident;
pub mod migrate;
mod monitor;
pub mod param;
pub mod prelude;
pub mod registry;
pub mod row;
pub mod schema;
pub mod session;
pub mod statement;
pub mod value;

pub use condition::{CmpOp, Condition, Operand, OrderBy, Pagination, SortDirection};
pub use config::{InsertMode, SessionConfig};
pub use dialect::{Dialect, KeyStrategy, Placeholder};
pub use engine::{Engine, EngineError, EngineErrorKind};
pub use error::{OrmError, OrmResult};
pub use ident::Ident;
pub use migrate::{DdlOp, MigrationPlan, create_table_sql, plan_migration};
pub use row::{Record, Row};
pub use schema::{
    ColumnDefault, FieldDef, FieldDescriptor, FieldType, IndexDef, SchemaBuilder, TableSchema,
};
pub use session::{InsertResult, RecordIter, Session};
pub use statement::{
    AggregateExpr, AggregateFn, AggregateQuery, DeletePlan, Find, InsertBatch, InsertPlan,
    Payload, Projection, QueryPlan, SelectItem, Statement, StatementKind, UpdatePlan,
};
pub use value::{FieldValue, Value};

#[cfg(feature = "duckdb")]
pub use engine::DuckDbEngine;

#[cfg(feature = "derive")]
pub use duckorm_derive::Record;

// Re-export inventory for use by derive macros
pub use inventory;
