//! Session support for the MySQL backend.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Params, Row, Value};

use crate::core::{Session, SessionState};
use crate::dialect::{Dialect, MySqlDialect};
use crate::error::{BackendError, SessionError, StorageError, StorageResult};
use crate::sql::{parse_timestamp, RenderedSql, SqlRow, SqlType, SqlValue};

static DIALECT: MySqlDialect = MySqlDialect;

fn decode_error(column: usize, expected: SqlType, message: String) -> StorageError {
    StorageError::Backend(BackendError::Decode {
        column,
        expected: expected.to_string(),
        message,
    })
}

/// A MySQL connection with an open transaction.
///
/// Temporary tables outlive transactions here, so the session drops them
/// itself when it ends.
pub struct MySqlSession {
    /// `None` once the session has ended.
    conn: Option<Conn>,
    state: SessionState,
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSession")
            .field("state", &self.state)
            .finish()
    }
}

impl MySqlSession {
    /// Begins a transaction on a pooled connection.
    pub(crate) async fn begin_on(mut conn: Conn) -> StorageResult<Self> {
        conn.query_drop(DIALECT.begin_statement())
            .await
            .map_err(|e| {
                StorageError::Session(SessionError::RolledBack {
                    reason: format!("Failed to begin transaction: {}", e),
                })
            })?;
        tracing::debug!("MySQL session started");

        Ok(Self {
            conn: Some(conn),
            state: SessionState::new(),
        })
    }

    fn conn(&mut self) -> StorageResult<&mut Conn> {
        self.state.ensure_active()?;
        self.conn
            .as_mut()
            .ok_or_else(|| StorageError::Session(SessionError::Inactive))
    }

    async fn finish(&mut self, end: &str) -> StorageResult<()> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| StorageError::Session(SessionError::Inactive))?;
        self.state.deactivate();
        let teardown = self.state.take_teardown(&DIALECT);

        let result = conn.query_drop(end).await.map_err(|e| {
            StorageError::Session(SessionError::RolledBack {
                reason: format!("{} failed: {}", end, e),
            })
        });

        if result.is_err() {
            let _ = conn.query_drop("ROLLBACK").await;
        }
        for drop in &teardown {
            if let Err(e) = conn.query_drop(drop.sql.as_str()).await {
                tracing::warn!(error = %e, sql = %drop.sql, "Failed to drop temporary table");
            }
        }
        result
    }
}

fn to_mysql_params(values: &[SqlValue]) -> Params {
    if values.is_empty() {
        return Params::Empty;
    }
    Params::Positional(values.iter().map(to_mysql_value).collect())
}

fn to_mysql_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        SqlValue::Integer(i) => Value::Int(*i),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Bool(b) => Value::Int(i64::from(*b)),
        SqlValue::Timestamp(dt) => {
            let naive = dt.naive_utc();
            Value::Date(
                // DATETIME covers years 1000..=9999.
                naive.year().clamp(0, i32::from(u16::MAX)) as u16,
                naive.month() as u8,
                naive.day() as u8,
                naive.hour() as u8,
                naive.minute() as u8,
                naive.second() as u8,
                dt.timestamp_subsec_micros(),
            )
        }
        SqlValue::Null(_) => Value::NULL,
    }
}

fn date_value(
    column: usize,
    (year, month, day, hour, minute, second, micros): (u16, u8, u8, u8, u8, u8, u32),
) -> StorageResult<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|date| {
            date.and_hms_micro_opt(
                u32::from(hour),
                u32::from(minute),
                u32::from(second),
                micros,
            )
        })
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            decode_error(
                column,
                SqlType::Timestamp,
                format!("{}-{}-{} {}:{}:{}.{}", year, month, day, hour, minute, second, micros),
            )
        })
}

fn parse_text_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| parse_timestamp(s))
}

fn from_mysql_value(column: usize, ty: Option<SqlType>, value: &Value) -> StorageResult<SqlValue> {
    let text = |bytes: &[u8]| {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| decode_error(column, ty.unwrap_or(SqlType::Text), e.to_string()))
    };
    let unexpected = |ty: SqlType, value: &Value| {
        decode_error(column, ty, format!("unexpected value {:?}", value))
    };

    match (ty, value) {
        (Some(ty), Value::NULL) => Ok(SqlValue::Null(ty)),
        (None, Value::NULL) => Ok(SqlValue::Null(SqlType::Text)),
        (Some(SqlType::Identifier | SqlType::Text) | None, Value::Bytes(bytes)) => {
            Ok(SqlValue::Text(text(bytes)?))
        }
        (Some(SqlType::BigInt) | None, Value::Int(i)) => Ok(SqlValue::Integer(*i)),
        (Some(SqlType::BigInt) | None, Value::UInt(u)) => i64::try_from(*u)
            .map(SqlValue::Integer)
            .map_err(|e| decode_error(column, SqlType::BigInt, e.to_string())),
        (Some(SqlType::BigInt), Value::Bytes(bytes)) => text(bytes)?
            .parse()
            .map(SqlValue::Integer)
            .map_err(|e| decode_error(column, SqlType::BigInt, e.to_string())),
        (Some(SqlType::Float64) | None, Value::Double(f)) => Ok(SqlValue::Float(*f)),
        (Some(SqlType::Float64) | None, Value::Float(f)) => Ok(SqlValue::Float(f64::from(*f))),
        (Some(SqlType::Float64), Value::Int(i)) => Ok(SqlValue::Float(*i as f64)),
        (Some(SqlType::Float64), Value::Bytes(bytes)) => text(bytes)?
            .parse()
            .map(SqlValue::Float)
            .map_err(|e| decode_error(column, SqlType::Float64, e.to_string())),
        (Some(SqlType::Boolean), Value::Int(i)) => Ok(SqlValue::Bool(*i != 0)),
        (Some(SqlType::Boolean), Value::UInt(u)) => Ok(SqlValue::Bool(*u != 0)),
        (Some(SqlType::Timestamp) | None, Value::Date(y, mo, d, h, mi, s, us)) => {
            date_value(column, (*y, *mo, *d, *h, *mi, *s, *us)).map(SqlValue::Timestamp)
        }
        (Some(SqlType::Timestamp), Value::Bytes(bytes)) => {
            let s = text(bytes)?;
            parse_text_timestamp(&s)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| decode_error(column, SqlType::Timestamp, format!("'{}'", s)))
        }
        (Some(ty), other) => Err(unexpected(ty, other)),
        (None, other) => Err(unexpected(SqlType::Text, other)),
    }
}

fn from_mysql_row(row: &Row, declared: &[SqlType]) -> StorageResult<SqlRow> {
    let mut values = Vec::with_capacity(row.len());
    for i in 0..row.len() {
        let value = row.as_ref(i).unwrap_or(&Value::NULL);
        values.push(from_mysql_value(i, declared.get(i).copied(), value)?);
    }
    Ok(SqlRow::new(values))
}

#[async_trait]
impl Session for MySqlSession {
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
        conn.exec_drop(sql.sql.as_str(), to_mysql_params(&sql.params))
            .await?;
        Ok(conn.affected_rows())
    }

    async fn query(&mut self, sql: &RenderedSql) -> StorageResult<Vec<SqlRow>> {
        let conn = self.conn()?;
        let rows: Vec<Row> = conn
            .exec(sql.sql.as_str(), to_mysql_params(&sql.params))
            .await?;
        rows.iter()
            .map(|row| from_mysql_row(row, &sql.columns))
            .collect()
    }

    async fn begin(&mut self) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.query_drop(DIALECT.begin_statement()).await?;
        tracing::debug!("MySQL transaction reopened after implicit commit");
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.state.ensure_active()?;
        self.finish("COMMIT").await?;
        tracing::debug!("MySQL session committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.state.ensure_active()?;
        self.finish("ROLLBACK").await?;
        tracing::debug!("MySQL session rolled back");
        Ok(())
    }
}

impl Drop for MySqlSession {
    fn drop(&mut self) {
        if self.state.is_active() {
            // The pool resets the connection when it comes back, which rolls
            // back the transaction and drops its temporary tables.
            tracing::warn!(
                temporary_tables = self.state.temporary_tables().len(),
                "MySQL session dropped while active, leaving cleanup to connection reset"
            );
            self.state.deactivate();
        }
    }
}
