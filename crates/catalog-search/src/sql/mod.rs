//! Dialect-portable SQL construction.
//!
//! Statements are built as trees and rendered by a [`Renderer`] for a
//! specific [`Dialect`](crate::dialect::Dialect). The same tree renders to
//! equivalent SQL on every supported engine; where an engine lacks a
//! construct, rendering fails with
//! [`SqlError::UnsupportedConstruct`](crate::error::SqlError::UnsupportedConstruct)
//! instead of silently changing meaning.
//!
//! # Example
//!
//! ```
//! use catalog_search::dialect::DialectKind;
//! use catalog_search::sql::{col, render, select, Projection, Relation, SqlType};
//!
//! let query = select([Projection::new(col("id"), SqlType::Identifier)])
//!     .from(Relation::table("items"))
//!     .filter(col("tenant_id").eq("acme"))
//!     .limit(10);
//!
//! let rendered = render(query, DialectKind::Strict.adapter()).unwrap();
//! assert_eq!(
//!     rendered.sql,
//!     "SELECT \"id\" FROM \"items\" WHERE \"tenant_id\" = $1 LIMIT $2"
//! );
//! assert_eq!(rendered.params.len(), 2);
//! ```

mod expr;
mod render;
mod schema;
mod statement;
mod value;

pub use expr::{and_all, coalesce, col, lit, BinaryOp, Expr, NullsOrder, OrderBy, SortDirection};
pub use render::{render, RenderedSql, Renderer};
pub use schema::{ColumnDef, ColumnRef, Relation, TableSchema};
pub use statement::{
    create_index, create_table, drop_table, insert_all, select, CreateIndex, CreateTable,
    DropTable, Insert, Join, JoinKind, OnConflict, Projection, Select, Statement,
};
pub use value::{
    format_timestamp, parse_timestamp, SqlRow, SqlType, SqlValue, TIMESTAMP_TEXT_FORMAT,
};
