//! PostgreSQL backend implementation.
//!
//! Speaks the strict dialect. Temporary tables are created `ON COMMIT DROP`
//! and bound parameters carry their exact types, so typed nulls matter here.
//!
//! # Example
//!
//! ```no_run
//! use catalog_search::backends::postgres::{PostgresBackend, PostgresConfig};
//! use catalog_search::core::Backend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = PostgresBackend::new(PostgresConfig {
//!     host: "localhost".to_string(),
//!     dbname: "catalog".to_string(),
//!     ..Default::default()
//! })
//! .await?;
//! backend.initialize().await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod session;

pub use crate::config::PostgresConfig;
pub use backend::PostgresBackend;
pub use session::PostgresSession;
