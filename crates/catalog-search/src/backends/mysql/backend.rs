//! MySQL backend implementation.

use std::fmt::Debug;

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Pool, PoolConstraints, PoolOpts};

use crate::catalog::CatalogSchema;
use crate::config::MySqlConfig;
use crate::core::{ensure_dialect, Backend, BackendKind, Session};
use crate::error::{BackendError, ConfigError, StorageError, StorageResult};

use super::session::MySqlSession;

fn connection_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::ConnectionFailed {
        backend_name: "mysql".to_string(),
        message,
    })
}

/// MySQL backend for the catalog and its staging tables.
pub struct MySqlBackend {
    pool: Pool,
    config: MySqlConfig,
}

impl Debug for MySqlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlBackend")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("database", &self.config.database)
            .field("max_connections", &self.config.max_connections)
            .finish_non_exhaustive()
    }
}

impl MySqlBackend {
    /// Creates a new MySQL backend with the given configuration.
    pub async fn new(config: MySqlConfig) -> StorageResult<Self> {
        let pool = Self::create_pool(&config)?;

        // Verify connectivity
        let conn = pool
            .get_conn()
            .await
            .map_err(|e| connection_error(e.to_string()))?;
        drop(conn);

        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Opened MySQL pool"
        );

        Ok(Self { pool, config })
    }

    /// Creates a backend from a connection string.
    pub async fn from_connection_string(url: &str) -> StorageResult<Self> {
        let config = MySqlConfig::from_url(url)?;
        Self::new(config).await
    }

    fn create_pool(config: &MySqlConfig) -> StorageResult<Pool> {
        let constraints = PoolConstraints::new(config.min_connections, config.max_connections)
            .ok_or_else(|| {
                StorageError::Config(ConfigError::InvalidValue {
                    field: "min_connections".to_string(),
                    message: format!(
                        "must not exceed max_connections ({})",
                        config.max_connections
                    ),
                })
            })?;

        // Resetting on return discards leftover transactions and temporary
        // tables of sessions that were dropped without ending.
        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_reset_connection(true);

        let opts = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(config.password.clone())
            .db_name(Some(config.database.clone()))
            .pool_opts(pool_opts);

        Ok(Pool::new(opts))
    }

    /// Get a connection from the pool.
    pub(crate) async fn get_conn(&self) -> StorageResult<Conn> {
        self.pool
            .get_conn()
            .await
            .map_err(|e| connection_error(e.to_string()))
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &MySqlConfig {
        &self.config
    }

    /// Closes every pooled connection.
    pub async fn disconnect(self) -> StorageResult<()> {
        self.pool.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    type Session = MySqlSession;

    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn session(&self) -> StorageResult<Self::Session> {
        let conn = self.get_conn().await?;
        let session = MySqlSession::begin_on(conn).await?;
        ensure_dialect(self.dialect(), session.dialect())?;
        Ok(session)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let mut conn = self.get_conn().await?;
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| connection_error(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    async fn initialize(&self) -> StorageResult<()> {
        let mut session = self.session().await?;
        CatalogSchema::create(&mut session).await?;
        Box::new(session).commit().await
    }
}
