//! PostgreSQL backend implementation.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::catalog::CatalogSchema;
use crate::config::PostgresConfig;
use crate::core::{ensure_dialect, Backend, BackendKind, Session};
use crate::error::{BackendError, StorageError, StorageResult};

use super::session::PostgresSession;

/// PostgreSQL backend for the catalog and its staging tables.
pub struct PostgresBackend {
    pool: Pool,
    config: PostgresConfig,
}

impl Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("dbname", &self.config.dbname)
            .field("max_connections", &self.config.max_connections)
            .finish_non_exhaustive()
    }
}

impl PostgresBackend {
    /// Creates a new PostgreSQL backend with the given configuration.
    pub async fn new(config: PostgresConfig) -> StorageResult<Self> {
        let pool = Self::create_pool(&config)?;

        // Verify connectivity
        let client = pool.get().await.map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "postgres".to_string(),
                message: e.to_string(),
            })
        })?;
        drop(client);

        tracing::debug!(
            host = %config.host,
            port = config.port,
            dbname = %config.dbname,
            "Opened PostgreSQL pool"
        );

        Ok(Self { pool, config })
    }

    /// Creates a backend from a connection string.
    pub async fn from_connection_string(url: &str) -> StorageResult<Self> {
        let config = PostgresConfig::from_url(url)?;
        Self::new(config).await
    }

    /// Creates a backend from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `CATALOG_PG_HOST` (default: "localhost")
    /// - `CATALOG_PG_PORT` (default: 5432)
    /// - `CATALOG_PG_DBNAME` (default: "catalog")
    /// - `CATALOG_PG_USER` (default: "catalog")
    /// - `CATALOG_PG_PASSWORD`
    /// - `CATALOG_PG_MAX_CONNECTIONS` (default: 10)
    pub async fn from_env() -> StorageResult<Self> {
        let defaults = PostgresConfig::default();
        let config = PostgresConfig {
            host: std::env::var("CATALOG_PG_HOST").unwrap_or(defaults.host),
            port: std::env::var("CATALOG_PG_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("CATALOG_PG_DBNAME").unwrap_or(defaults.dbname),
            user: std::env::var("CATALOG_PG_USER").unwrap_or(defaults.user),
            password: std::env::var("CATALOG_PG_PASSWORD").ok(),
            max_connections: std::env::var("CATALOG_PG_MAX_CONNECTIONS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.max_connections),
            ..defaults
        };
        Self::new(config).await
    }

    fn create_pool(config: &PostgresConfig) -> StorageResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.dbname = Some(config.dbname.clone());
        cfg.user = Some(config.user.clone());
        cfg.password = config.password.clone();
        cfg.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
        cfg.options = Some(format!(
            "-c statement_timeout={}",
            config.statement_timeout_ms
        ));
        // Verified recycling catches connections whose server side has gone away.
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Verified,
        });

        let pool = cfg
            .builder(NoTls)
            .map_err(|e| {
                StorageError::Backend(BackendError::Internal {
                    backend_name: "postgres".to_string(),
                    message: format!("Failed to create pool builder: {}", e),
                })
            })?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| {
                StorageError::Backend(BackendError::ConnectionFailed {
                    backend_name: "postgres".to_string(),
                    message: e.to_string(),
                })
            })?;

        Ok(pool)
    }

    /// Get a client from the pool.
    pub(crate) async fn get_client(&self) -> StorageResult<deadpool_postgres::Client> {
        self.pool.get().await.map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "postgres".to_string(),
                message: e.to_string(),
            })
        })
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    type Session = PostgresSession;

    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn session(&self) -> StorageResult<Self::Session> {
        let client = self.get_client().await?;
        let session = PostgresSession::begin_on(client).await?;
        ensure_dialect(self.dialect(), session.dialect())?;
        Ok(session)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let client = self.get_client().await?;
        client.execute("SELECT 1", &[]).await.map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "postgres".to_string(),
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
