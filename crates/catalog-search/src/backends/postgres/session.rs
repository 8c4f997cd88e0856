//! Session support for the PostgreSQL backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Client;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::Row;

use crate::core::{Session, SessionState};
use crate::dialect::{Dialect, PostgresDialect};
use crate::error::{BackendError, SessionError, StorageError, StorageResult};
use crate::sql::{RenderedSql, SqlRow, SqlType, SqlValue};

static DIALECT: PostgresDialect = PostgresDialect;

type BoxedParam = Box<dyn ToSql + Sync + Send>;

fn decode_error(column: usize, expected: SqlType, err: tokio_postgres::Error) -> StorageError {
    StorageError::Backend(BackendError::Decode {
        column,
        expected: expected.to_string(),
        message: err.to_string(),
    })
}

/// A PostgreSQL client with an open transaction.
///
/// Temporary tables are `ON COMMIT DROP`, so ending the transaction is all
/// the teardown they need.
pub struct PostgresSession {
    /// `None` once the session has ended.
    client: Option<Client>,
    state: SessionState,
}

impl std::fmt::Debug for PostgresSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSession")
            .field("state", &self.state)
            .finish()
    }
}

impl PostgresSession {
    /// Begins a transaction on a pooled client.
    pub(crate) async fn begin_on(client: Client) -> StorageResult<Self> {
        client
            .batch_execute(DIALECT.begin_statement())
            .await
            .map_err(|e| {
                StorageError::Session(SessionError::RolledBack {
                    reason: format!("Failed to begin transaction: {}", e),
                })
            })?;
        tracing::debug!("PostgreSQL session started");

        Ok(Self {
            client: Some(client),
            state: SessionState::new(),
        })
    }

    fn client(&self) -> StorageResult<&Client> {
        self.state.ensure_active()?;
        self.client
            .as_ref()
            .ok_or_else(|| StorageError::Session(SessionError::Inactive))
    }

    async fn finish(&mut self, end: &str) -> StorageResult<()> {
        let client = self
            .client
            .take()
            .ok_or_else(|| StorageError::Session(SessionError::Inactive))?;
        self.state.deactivate();
        // Transaction-scoped temporary tables need no explicit drop.
        let _ = self.state.take_teardown(&DIALECT);

        client.batch_execute(end).await.map_err(|e| {
            StorageError::Session(SessionError::RolledBack {
                reason: format!("{} failed: {}", end, e),
            })
        })
    }
}

fn to_postgres_param(value: &SqlValue) -> BoxedParam {
    match value {
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Integer(i) => Box::new(*i),
        SqlValue::Float(f) => Box::new(*f),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::Timestamp(dt) => Box::new(*dt),
        SqlValue::Null(ty) => match ty {
            SqlType::Identifier | SqlType::Text => Box::new(None::<String>),
            SqlType::BigInt => Box::new(None::<i64>),
            SqlType::Float64 => Box::new(None::<f64>),
            SqlType::Boolean => Box::new(None::<bool>),
            SqlType::Timestamp => Box::new(None::<DateTime<Utc>>),
        },
    }
}

/// Maps a server column type to the logical type used for decoding.
fn logical_type(ty: &Type) -> SqlType {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 => SqlType::BigInt,
        Type::FLOAT4 | Type::FLOAT8 => SqlType::Float64,
        Type::BOOL => SqlType::Boolean,
        Type::TIMESTAMPTZ => SqlType::Timestamp,
        _ => SqlType::Text,
    }
}

fn from_postgres_row(row: &Row, declared: &[SqlType]) -> StorageResult<SqlRow> {
    let mut values = Vec::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let ty = declared
            .get(i)
            .copied()
            .unwrap_or_else(|| logical_type(column.type_()));
        let pg_type = column.type_();
        let value = match ty {
            SqlType::BigInt if *pg_type == Type::INT4 => row
                .try_get::<_, Option<i32>>(i)
                .map(|v| v.map(|n| SqlValue::Integer(i64::from(n)))),
            SqlType::BigInt => row
                .try_get::<_, Option<i64>>(i)
                .map(|v| v.map(SqlValue::Integer)),
            SqlType::Float64 if *pg_type == Type::FLOAT4 => row
                .try_get::<_, Option<f32>>(i)
                .map(|v| v.map(|f| SqlValue::Float(f64::from(f)))),
            SqlType::Float64 => row
                .try_get::<_, Option<f64>>(i)
                .map(|v| v.map(SqlValue::Float)),
            SqlType::Boolean => row
                .try_get::<_, Option<bool>>(i)
                .map(|v| v.map(SqlValue::Bool)),
            SqlType::Timestamp => row
                .try_get::<_, Option<DateTime<Utc>>>(i)
                .map(|v| v.map(SqlValue::Timestamp)),
            SqlType::Identifier | SqlType::Text => row
                .try_get::<_, Option<String>>(i)
                .map(|v| v.map(SqlValue::Text)),
        }
        .map_err(|e| decode_error(i, ty, e))?;
        values.push(value.unwrap_or(SqlValue::Null(ty)));
    }
    Ok(SqlRow::new(values))
}

#[async_trait]
impl Session for PostgresSession {
    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    fn state(&self) -> &SessionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    async fn execute(&mut self, sql: &RenderedSql) -> StorageResult<u64> {
        let client = self.client()?;
        let params: Vec<BoxedParam> = sql.params.iter().map(to_postgres_param).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let changed = client.execute(sql.sql.as_str(), &param_refs).await?;
        Ok(changed)
    }

    async fn query(&mut self, sql: &RenderedSql) -> StorageResult<Vec<SqlRow>> {
        let client = self.client()?;
        let params: Vec<BoxedParam> = sql.params.iter().map(to_postgres_param).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = client.query(sql.sql.as_str(), &param_refs).await?;
        rows.iter()
            .map(|row| from_postgres_row(row, &sql.columns))
            .collect()
    }

    async fn begin(&mut self) -> StorageResult<()> {
        // Index DDL is transactional here, so the transaction is still open.
        self.client()?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.state.ensure_active()?;
        self.finish("COMMIT").await?;
        tracing::debug!("PostgreSQL session committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.state.ensure_active()?;
        self.finish("ROLLBACK").await?;
        tracing::debug!("PostgreSQL session rolled back");
        Ok(())
    }
}

impl Drop for PostgresSession {
    fn drop(&mut self) {
        if !self.state.is_active() {
            return;
        }
        self.state.deactivate();
        let Some(client) = self.client.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!("PostgreSQL session dropped while active, rolling back");
                handle.spawn(async move {
                    if let Err(e) = client.batch_execute("ROLLBACK").await {
                        tracing::warn!(error = %e, "Rollback of dropped session failed");
                    }
                });
            }
            Err(_) => {
                // No runtime to roll back on: detach the connection so the
                // open transaction dies with it instead of returning to the pool.
                tracing::warn!("PostgreSQL session dropped outside a runtime, discarding connection");
                drop(Client::take(client));
            }
        }
    }
}
