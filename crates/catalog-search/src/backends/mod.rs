//! Database backend implementations.
//!
//! Each backend is gated behind a feature flag and implements
//! [`Backend`](crate::core::Backend) with its own [`Session`](crate::core::Session).
//!
//! # Available Backends
//!
//! | Backend | Feature | Dialect | Pool |
//! |---------|---------|---------|------|
//! | SQLite | `sqlite` (default) | embedded | r2d2 |
//! | PostgreSQL | `postgres` | strict | deadpool |
//! | MySQL | `mysql` | weak row count | mysql_async |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! use catalog_search::backends::sqlite::SqliteBackend;
//!
//! # #[cfg(feature = "sqlite")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use catalog_search::core::Backend;
//!
//! // Create an in-memory SQLite backend
//! let backend = SqliteBackend::in_memory()?;
//! backend.initialize().await?;
//!
//! // Or use a file-based database
//! let backend = SqliteBackend::open("./data/catalog.db")?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;
