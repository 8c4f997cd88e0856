//! Error types for the catalog search layer.
//!
//! This module defines all error types used throughout the crate, following a
//! hierarchy that separates SQL rendering errors, temporary table errors,
//! staging errors, session errors and backend errors.
//!
//! Every error is fatal for the query that produced it. Nothing in this crate
//! retries internally: a partially staged table is never safe to resume, so
//! a retry must restart the whole staging and join from the top.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all catalog search operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQL construction and rendering errors
    #[error(transparent)]
    Sql(#[from] SqlError),

    /// Temporary table lifecycle errors
    #[error(transparent)]
    Table(#[from] TableError),

    /// Search-result staging errors
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Session and transaction errors
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while rendering a statement tree to SQL text.
///
/// These are programming or configuration errors. They should surface in
/// integration tests, never per request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    /// The dialect has no mapping for a construct used in the tree.
    #[error("construct '{construct}' is not supported by the {dialect} dialect")]
    UnsupportedConstruct {
        dialect: &'static str,
        construct: String,
    },

    /// The statement tree is malformed.
    #[error("invalid statement: {message}")]
    InvalidStatement { message: String },
}

/// Errors related to the staging table lifecycle.
#[derive(Error, Debug)]
pub enum TableError {
    /// A relation with the requested name already exists in the session.
    #[error("relation '{name}' already exists in this session")]
    NameCollision { name: String },

    /// The requested table name is not a valid identifier.
    #[error("invalid table name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The dialect rejected the table definition.
    #[error("failed to create table '{name}': {message}")]
    CreationFailed {
        name: String,
        message: String,
        #[source]
        source: Option<Box<StorageError>>,
    },
}

/// Errors raised while staging a search result stream.
#[derive(Error, Debug)]
pub enum StagingError {
    /// A bulk insert failed mid-stream.
    #[error("staging insert into '{table}' failed after {staged_rows} rows: {message}")]
    InsertFailed {
        table: String,
        staged_rows: u64,
        message: String,
        #[source]
        source: Option<Box<StorageError>>,
    },

    /// The search engine result stream yielded an error.
    #[error("search result stream failed after {batches} batches: {message}")]
    Source {
        batches: u64,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The lookup index could not be built.
    #[error("failed to index staged table '{table}': {message}")]
    IndexFailed { table: String, message: String },
}

/// Errors related to sessions and their transactions.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session has already been committed or rolled back.
    #[error("session is no longer active")]
    Inactive,

    /// The session's dialect does not match the backend it was opened on.
    #[error("dialect mismatch: backend is {expected}, session reports {actual}")]
    DialectMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The transaction was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Query execution error.
    #[error("query execution failed on {backend_name}: {message}")]
    QueryFailed {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A result column could not be decoded into the expected type.
    #[error("failed to decode column {column} as {expected}: {message}")]
    Decode {
        column: usize,
        expected: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
    },
}

/// Errors related to configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration field holds an invalid value.
    #[error("invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// The requested backend was not compiled in.
    #[error("backend '{backend}' is not enabled in this build")]
    BackendNotEnabled { backend: String },

    /// The dialect name could not be recognised.
    #[error("unknown dialect '{name}'")]
    UnknownDialect { name: String },
}

/// Result type alias for catalog search operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for SQL rendering.
pub type SqlResult<T> = Result<T, SqlError>;

impl StorageError {
    /// Returns the backend error message if this error came from a driver.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            StorageError::Backend(BackendError::QueryFailed { message, .. })
            | StorageError::Backend(BackendError::ConnectionFailed { message, .. })
            | StorageError::Backend(BackendError::Internal { message, .. }) => Some(message),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "serde_json".to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::QueryFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for StorageError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Server errors display as "db error"; keep the SQLSTATE and detail.
        let message = match err.as_db_error() {
            Some(db) => format!("{} (SQLSTATE {})", db, db.code().code()),
            None => err.to_string(),
        };
        StorageError::Backend(BackendError::QueryFailed {
            backend_name: "postgres".to_string(),
            message,
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "mysql")]
impl From<mysql_async::Error> for StorageError {
    fn from(err: mysql_async::Error) -> Self {
        StorageError::Backend(BackendError::QueryFailed {
            backend_name: "mysql".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}
