//! Session support for the SQLite backend.

use async_trait::async_trait;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Value, ValueRef};

use crate::core::{Session, SessionState};
use crate::dialect::{Dialect, SqliteDialect};
use crate::error::{BackendError, SessionError, StorageError, StorageResult};
use crate::sql::{format_timestamp, parse_timestamp, RenderedSql, SqlRow, SqlType, SqlValue};

static DIALECT: SqliteDialect = SqliteDialect;

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
    })
}

fn decode_error(column: usize, expected: SqlType, message: String) -> StorageError {
    StorageError::Backend(BackendError::Decode {
        column,
        expected: expected.to_string(),
        message,
    })
}

/// A SQLite connection with an open transaction.
pub struct SqliteSession {
    /// `None` once the session has ended.
    conn: Option<PooledConnection<SqliteConnectionManager>>,
    state: SessionState,
}

impl std::fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession")
            .field("state", &self.state)
            .finish()
    }
}

impl SqliteSession {
    /// Begins a transaction on a pooled connection.
    pub(crate) fn begin_on(conn: PooledConnection<SqliteConnectionManager>) -> StorageResult<Self> {
        conn.execute_batch(DIALECT.begin_statement()).map_err(|e| {
            StorageError::Session(SessionError::RolledBack {
                reason: format!("Failed to begin transaction: {}", e),
            })
        })?;
        tracing::debug!("SQLite session started");

        Ok(Self {
            conn: Some(conn),
            state: SessionState::new(),
        })
    }

    fn conn(&self) -> StorageResult<&rusqlite::Connection> {
        self.state.ensure_active()?;
        self.conn
            .as_deref()
            .ok_or_else(|| StorageError::Session(SessionError::Inactive))
    }

    /// Ends the transaction with `COMMIT` or `ROLLBACK`, then drops the
    /// session's temporary tables.
    fn finish(&mut self, end: &str) -> StorageResult<()> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| StorageError::Session(SessionError::Inactive))?;
        self.state.deactivate();
        let teardown = self.state.take_teardown(&DIALECT);

        let result = conn.execute_batch(end).map_err(|e| {
            StorageError::Session(SessionError::RolledBack {
                reason: format!("{} failed: {}", end, e),
            })
        });

        if result.is_err() {
            let _ = conn.execute_batch("ROLLBACK");
        }
        for drop in &teardown {
            if let Err(e) = conn.execute_batch(&drop.sql) {
                tracing::warn!(error = %e, sql = %drop.sql, "Failed to drop temporary table");
            }
        }
        result
    }
}

fn to_sqlite_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Integer(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Timestamp(dt) => Value::Text(format_timestamp(dt)),
        SqlValue::Null(_) => Value::Null,
    }
}

fn from_sqlite_value(column: usize, ty: Option<SqlType>, value: ValueRef<'_>) -> StorageResult<SqlValue> {
    let text = |bytes: &[u8]| {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| decode_error(column, ty.unwrap_or(SqlType::Text), e.to_string()))
    };

    match (ty, value) {
        (Some(ty), ValueRef::Null) => Ok(SqlValue::Null(ty)),
        (None, ValueRef::Null) => Ok(SqlValue::Null(SqlType::Text)),
        (Some(SqlType::Timestamp), ValueRef::Text(bytes)) => {
            let s = text(bytes)?;
            parse_timestamp(&s)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| decode_error(column, SqlType::Timestamp, format!("'{}'", s)))
        }
        (Some(SqlType::Boolean), ValueRef::Integer(i)) => Ok(SqlValue::Bool(i != 0)),
        (Some(SqlType::Float64), ValueRef::Integer(i)) => Ok(SqlValue::Float(i as f64)),
        (Some(SqlType::Identifier | SqlType::Text), ValueRef::Integer(i)) => {
            Ok(SqlValue::Text(i.to_string()))
        }
        (Some(SqlType::BigInt), ValueRef::Real(f)) if f.fract() == 0.0 => {
            Ok(SqlValue::Integer(f as i64))
        }
        (Some(SqlType::Identifier | SqlType::Text) | None, ValueRef::Text(bytes)) => {
            Ok(SqlValue::Text(text(bytes)?))
        }
        (Some(SqlType::BigInt) | None, ValueRef::Integer(i)) => Ok(SqlValue::Integer(i)),
        (Some(SqlType::Float64) | None, ValueRef::Real(f)) => Ok(SqlValue::Float(f)),
        (Some(ty), other) => Err(decode_error(
            column,
            ty,
            format!("unexpected storage class {:?}", other.data_type()),
        )),
        (None, ValueRef::Blob(_)) => Err(internal_error(format!(
            "column {} holds a blob, which is not supported",
            column
        ))),
    }
}

#[async_trait]
impl Session for SqliteSession {
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
        let conn = self.conn()?;
        let params = sql.params.iter().map(to_sqlite_value);
        let mut stmt = conn.prepare_cached(&sql.sql)?;
        let changed = stmt.execute(rusqlite::params_from_iter(params))?;
        Ok(changed as u64)
    }

    async fn query(&mut self, sql: &RenderedSql) -> StorageResult<Vec<SqlRow>> {
        let conn = self.conn()?;
        let params = sql.params.iter().map(to_sqlite_value);
        let mut stmt = conn.prepare_cached(&sql.sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let ty = sql.columns.get(i).copied();
                values.push(from_sqlite_value(i, ty, row.get_ref(i)?)?);
            }
            out.push(SqlRow::new(values));
        }
        Ok(out)
    }

    async fn begin(&mut self) -> StorageResult<()> {
        let conn = self.conn()?;
        if conn.is_autocommit() {
            conn.execute_batch(DIALECT.begin_statement())?;
        }
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.state.ensure_active()?;
        self.finish("COMMIT")?;
        tracing::debug!("SQLite session committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.state.ensure_active()?;
        self.finish("ROLLBACK")?;
        tracing::debug!("SQLite session rolled back");
        Ok(())
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        // If the session wasn't explicitly committed or rolled back, roll it back
        if self.state.is_active() {
            tracing::debug!("SQLite session dropped while active, rolling back");
            let _ = self.finish("ROLLBACK");
        }
    }
}
