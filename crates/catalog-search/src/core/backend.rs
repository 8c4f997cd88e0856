//! Backend abstraction for database drivers.
//!
//! A [`Backend`] owns a connection pool for one engine and hands out
//! [`Session`]s. Each backend speaks exactly one dialect; opening a
//! session verifies that the connection and the adapter agree.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::dialect::{Dialect, DialectKind};
use crate::error::{SessionError, StorageError, StorageResult};

use super::session::Session;

/// Identifies the type of database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// SQLite database (file-based or in-memory).
    Sqlite,
    /// PostgreSQL database.
    Postgres,
    /// MySQL or MariaDB database.
    MySql,
}

impl BackendKind {
    /// Returns the dialect this backend speaks.
    pub fn dialect_kind(&self) -> DialectKind {
        match self {
            BackendKind::Sqlite => DialectKind::Embedded,
            BackendKind::Postgres => DialectKind::Strict,
            BackendKind::MySql => DialectKind::WeakRowCount,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Postgres => write!(f, "postgres"),
            BackendKind::MySql => write!(f, "mysql"),
        }
    }
}

/// A database backend that opens sessions.
///
/// # Example
///
/// ```ignore
/// use catalog_search::core::{Backend, Session};
///
/// let mut session = backend.session().await?;
/// let staged = stager.stage(&mut session, results).await?;
/// let rows = engine
///     .query_items(&mut session, &spec, as_of, 0, batch, Some(&staged))
///     .await?
///     .collect_all()
///     .await?;
/// Box::new(session).commit().await?;
/// ```
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// The session type produced by this backend.
    type Session: Session;

    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;

    /// Returns the dialect adapter for this backend.
    fn dialect(&self) -> &'static dyn Dialect {
        self.kind().dialect_kind().adapter()
    }

    /// Acquires a pooled connection and begins a transaction on it.
    async fn session(&self) -> StorageResult<Self::Session>;

    /// Checks if the backend is healthy and accepting connections.
    async fn health_check(&self) -> StorageResult<()>;

    /// Creates the catalog schema if it does not exist.
    async fn initialize(&self) -> StorageResult<()>;
}

/// Fails with [`SessionError::DialectMismatch`] unless both dialects agree.
pub fn ensure_dialect(expected: &dyn Dialect, actual: &dyn Dialect) -> StorageResult<()> {
    if expected.kind() == actual.kind() {
        Ok(())
    } else {
        Err(StorageError::Session(SessionError::DialectMismatch {
            expected: expected.name(),
            actual: actual.name(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Sqlite.to_string(), "sqlite");
        assert_eq!(BackendKind::Postgres.to_string(), "postgres");
        assert_eq!(BackendKind::MySql.to_string(), "mysql");
    }

    #[test]
    fn test_backend_kind_dialects() {
        for kind in [BackendKind::Sqlite, BackendKind::Postgres, BackendKind::MySql] {
            assert_eq!(kind.dialect_kind().name(), kind.to_string());
        }
    }

    #[test]
    fn test_ensure_dialect() {
        let strict = DialectKind::Strict.adapter();
        let embedded = DialectKind::Embedded.adapter();
        assert!(ensure_dialect(strict, strict).is_ok());
        let err = ensure_dialect(strict, embedded).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Session(SessionError::DialectMismatch {
                expected: "postgres",
                actual: "sqlite"
            })
        ));
    }
}
