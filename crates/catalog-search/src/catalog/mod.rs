//! The relational item catalog and the join engine that queries it.
//!
//! Catalog queries are always scoped to one tenant and evaluated as of an
//! instant, so items created later or deleted earlier are invisible. When a
//! search has been staged, the engine inner-joins the staged table and ranks
//! by relevance; otherwise items come back newest first.
//!
//! # Example
//!
//! ```ignore
//! use catalog_search::catalog::{column, ItemColumn, ItemQueryEngine, QuerySpec};
//! use catalog_search::types::BatchSpec;
//!
//! let spec = QuerySpec::new("acme").with_filter(column(ItemColumn::Title).like("%pump%"));
//! let mut cursor = engine
//!     .query_items(&mut session, &spec, as_of, 0, BatchSpec::first(20), Some(&staged))
//!     .await?;
//! while let Some(row) = cursor.next().await? {
//!     println!("{} {:?}", row.title, row.context);
//! }
//! ```

mod cursor;
mod engine;
mod pipeline;
mod query;
mod schema;

pub use cursor::ResultCursor;
pub use engine::ItemQueryEngine;
pub use pipeline::{SearchPage, SearchPipeline};
pub use query::{DateRange, MatchContext, MatchedAttachment, QuerySpec, ResultRow};
pub use schema::{column, CatalogItem, CatalogSchema, ItemColumn, CATALOG_TABLE};
