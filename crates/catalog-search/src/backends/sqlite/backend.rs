//! SQLite backend implementation.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::catalog::CatalogSchema;
use crate::config::SqliteBackendConfig;
use crate::core::{ensure_dialect, Backend, BackendKind, Session};
use crate::error::{BackendError, StorageError, StorageResult};

use super::session::SqliteSession;

fn connection_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::ConnectionFailed {
        backend_name: "sqlite".to_string(),
        message,
    })
}

/// SQLite backend for the catalog and its staging tables.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    is_memory: bool,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend.
    ///
    /// An in-memory database lives inside a single connection, so the pool
    /// is pinned to one connection that is never retired.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(SqliteBackendConfig::default())
    }

    /// Opens or creates a file-based SQLite database.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(SqliteBackendConfig {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        })
    }

    /// Creates a backend with custom configuration.
    pub fn with_config(config: SqliteBackendConfig) -> StorageResult<Self> {
        let is_memory = config
            .path
            .as_deref()
            .is_none_or(|p| p.as_os_str() == ":memory:");

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let enable_wal = config.enable_wal && !is_memory;
        let manager = match (&config.path, is_memory) {
            (Some(path), false) => SqliteConnectionManager::file(path),
            _ => SqliteConnectionManager::memory(),
        }
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if enable_wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            }
            Ok(())
        });

        let builder = Pool::builder().connection_timeout(Duration::from_millis(
            config.connection_timeout_ms,
        ));
        let builder = if is_memory {
            builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections))
        };

        let pool = builder
            .build(manager)
            .map_err(|e| connection_error(e.to_string()))?;

        tracing::debug!(
            is_memory,
            max_connections = pool.max_size(),
            "Opened SQLite pool"
        );

        Ok(Self {
            pool,
            config,
            is_memory,
        })
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(
        &self,
    ) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| connection_error(e.to_string()))
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    type Session = SqliteSession;

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn session(&self) -> StorageResult<Self::Session> {
        let conn = self.get_connection()?;
        let session = SqliteSession::begin_on(conn)?;
        ensure_dialect(self.dialect(), session.dialect())?;
        Ok(session)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| {
                StorageError::Backend(BackendError::ConnectionFailed {
                    backend_name: "sqlite".to_string(),
                    message: format!("Health check failed: {}", e),
                })
            })?;
        Ok(())
    }

    async fn initialize(&self) -> StorageResult<()> {
        let mut session = self.session().await?;
        CatalogSchema::create(&mut session).await?;
        Box::new(session).commit().await
    }
}
