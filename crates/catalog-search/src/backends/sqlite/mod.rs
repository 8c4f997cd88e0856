//! SQLite backend implementation.
//!
//! Supports both in-memory databases (great for testing) and file-based
//! databases (for development and small deployments). It speaks the
//! embedded dialect: temporary tables are connection-scoped and are
//! dropped by the session when it ends, and timestamps are stored as
//! fixed-width UTC text.
//!
//! # Example
//!
//! ```no_run
//! use catalog_search::backends::sqlite::SqliteBackend;
//! use catalog_search::core::{Backend, Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.initialize().await?;
//!
//! let session = backend.session().await?;
//! Box::new(session).commit().await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod session;

pub use crate::config::SqliteBackendConfig;
pub use backend::SqliteBackend;
pub use session::SqliteSession;
