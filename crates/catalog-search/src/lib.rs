//! Catalog Search
//!
//! This crate joins ranked full-text search results against a relational
//! item catalog. Search engine matches arrive as a chunked stream, are staged
//! into a session-scoped temporary table and then inner-joined with the
//! catalog, so relevance ranking, tenant filtering and pagination all happen
//! in one SQL query.
//!
//! # Features
//!
//! - **Dialect-portable SQL**: a small expression DSL rendered per engine,
//!   always with bind parameters
//! - **Temporary staging tables**: created, indexed and torn down with the session
//! - **Keep-the-best deduplication**: repeated matches for an item keep the larger score
//! - **Lazy results**: a pull cursor fetching bounded pages
//!
//! # Backend Features
//!
//! Enable backends with feature flags in `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! catalog-search = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! Available backend features:
//! - `sqlite` (default) - SQLite with in-memory and file modes
//! - `postgres` - PostgreSQL via deadpool
//! - `mysql` - MySQL via mysql_async
//!
//! # Architecture
//!
//! - [`sql`] - Expression DSL, statements and the renderer
//! - [`dialect`] - Per-engine SQL differences behind one trait
//! - [`core`] - Backend and session traits
//! - [`backends`] - Backend implementations
//! - [`staging`] - Temporary tables and the search-result stager
//! - [`catalog`] - The item catalog and the join engine
//! - [`config`] - Serde configuration
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use catalog_search::backends::sqlite::SqliteBackend;
//! use catalog_search::catalog::{QuerySpec, SearchPipeline};
//! use catalog_search::config::CatalogSearchConfig;
//! use catalog_search::core::Backend;
//! use catalog_search::staging::{ItemMatch, SearchResultBatch};
//! use catalog_search::types::BatchSpec;
//!
//! let backend = SqliteBackend::in_memory()?;
//! backend.initialize().await?;
//!
//! let results = futures::stream::iter(vec![Ok::<_, std::io::Error>(
//!     SearchResultBatch::new(1).with_match(ItemMatch::item("m-1", "item-1", "acme", 3.5)),
//! )]);
//!
//! let pipeline = SearchPipeline::new(&CatalogSearchConfig::default());
//! let page = pipeline
//!     .run(&backend, &QuerySpec::new("acme"), chrono::Utc::now(), 0, BatchSpec::first(20), results)
//!     .await?;
//! println!("{} of {} rows", page.rows.len(), page.total);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod catalog;
pub mod config;
pub mod core;
pub mod dialect;
pub mod error;
pub mod sql;
pub mod staging;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use types::{BatchInfo, BatchSpec, ItemId, TenantId};

// Re-export core traits
pub use core::{Backend, BackendKind, Session};

pub use catalog::{ItemQueryEngine, QuerySpec, ResultCursor, ResultRow, SearchPipeline};
pub use config::CatalogSearchConfig;
pub use dialect::{Dialect, DialectKind};
pub use staging::{SearchResultBatch, SearchResultStager, StagedResults};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
