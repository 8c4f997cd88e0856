//! Dialect adapters.
//!
//! A [`Dialect`] is a stateless policy object describing how one database
//! engine spells portable constructs: placeholders, identifier quoting,
//! type names, temporary tables, index DDL, upserts and row-count
//! reliability. Query-building code never branches on the engine itself;
//! it asks the adapter.
//!
//! | Kind | Engine | Temp table scope | Reliable row count |
//! |------|--------|------------------|--------------------|
//! | [`DialectKind::Strict`] | PostgreSQL | transaction | yes |
//! | [`DialectKind::WeakRowCount`] | MySQL | connection | no |
//! | [`DialectKind::Embedded`] | SQLite | connection | yes |

mod mysql;
mod postgres;
mod sqlite;

use std::fmt::Debug;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SqlError, SqlResult, StorageError};
use crate::sql::{OnConflict, SqlType, TableSchema};

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// Identifies a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialectKind {
    /// Strict enterprise dialect (PostgreSQL).
    Strict,
    /// Dialect with weaker row-count guarantees (MySQL).
    WeakRowCount,
    /// Embedded dialect (SQLite).
    Embedded,
}

static POSTGRES: PostgresDialect = PostgresDialect;
static MYSQL: MySqlDialect = MySqlDialect;
static SQLITE: SqliteDialect = SqliteDialect;

impl DialectKind {
    /// All dialect kinds.
    pub const ALL: [DialectKind; 3] = [
        DialectKind::Strict,
        DialectKind::WeakRowCount,
        DialectKind::Embedded,
    ];

    /// Returns the engine name.
    pub fn name(&self) -> &'static str {
        match self {
            DialectKind::Strict => "postgres",
            DialectKind::WeakRowCount => "mysql",
            DialectKind::Embedded => "sqlite",
        }
    }

    /// Returns the shared adapter for this dialect.
    pub fn adapter(&self) -> &'static dyn Dialect {
        match self {
            DialectKind::Strict => &POSTGRES,
            DialectKind::WeakRowCount => &MYSQL,
            DialectKind::Embedded => &SQLITE,
        }
    }
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DialectKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" | "strict" => Ok(DialectKind::Strict),
            "mysql" | "mariadb" | "weak-row-count" | "weak_row_count" => {
                Ok(DialectKind::WeakRowCount)
            }
            "sqlite" | "sqlite3" | "embedded" => Ok(DialectKind::Embedded),
            _ => Err(ConfigError::UnknownDialect {
                name: s.to_string(),
            }),
        }
    }
}

/// Lifetime of a temporary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempTableScope {
    /// Dropped by the engine when the transaction ends.
    Transaction,
    /// Lives as long as the connection; the session drops it explicitly.
    Connection,
}

/// Per-engine SQL policy.
pub trait Dialect: Send + Sync + Debug {
    /// Returns the dialect kind.
    fn kind(&self) -> DialectKind;

    /// Returns the engine name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Returns the placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String;

    /// Maps a logical type to the engine's column type.
    fn column_type(&self, ty: SqlType) -> &'static str;

    /// Returns how long temporary tables live.
    fn temporary_table_scope(&self) -> TempTableScope;

    /// Renders `CREATE TEMPORARY TABLE` for the schema.
    fn temporary_table_ddl(&self, schema: &TableSchema) -> SqlResult<String>;

    /// Renders `CREATE TABLE` for a permanent table.
    fn create_table_ddl(&self, schema: &TableSchema, if_not_exists: bool) -> SqlResult<String> {
        let prefix = if if_not_exists {
            "CREATE TABLE IF NOT EXISTS"
        } else {
            "CREATE TABLE"
        };
        Ok(format!(
            "{} {} ({})",
            prefix,
            self.quote_identifier(schema.name()),
            table_body(self, schema)?
        ))
    }

    /// Renders `DROP TABLE`.
    fn drop_table_ddl(&self, name: &str, if_exists: bool, _temporary: bool) -> String {
        if if_exists {
            format!("DROP TABLE IF EXISTS {}", self.quote_identifier(name))
        } else {
            format!("DROP TABLE {}", self.quote_identifier(name))
        }
    }

    /// Renders `CREATE INDEX`.
    fn index_ddl(&self, index_name: &str, table: &str, columns: &[String]) -> String;

    /// Returns true if `error` reports that the index already exists.
    fn index_already_exists(&self, _error: &StorageError) -> bool {
        false
    }

    /// Returns true if creating an index ends the open transaction.
    fn index_ddl_commits(&self) -> bool {
        false
    }

    /// Returns true if bulk-insert row counts equal the number of rows written.
    fn bulk_insert_reliable_row_count(&self) -> bool {
        true
    }

    /// Returns true if `NULLS FIRST` / `NULLS LAST` can be rendered.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    /// Returns true if [`Dialect::upsert_clause`] is available.
    fn supports_upsert(&self) -> bool {
        true
    }

    /// Renders the clause appended to an `INSERT` to resolve key conflicts.
    fn upsert_clause(&self, table: &str, conflict: &OnConflict) -> SqlResult<String>;

    /// Maximum number of bind parameters in one statement.
    fn max_bind_parameters(&self) -> usize;

    /// Returns the statement that opens a transaction.
    fn begin_statement(&self) -> &'static str {
        "BEGIN"
    }
}

/// Doubles `quote` inside `name` and wraps it.
pub(crate) fn quote_with(name: &str, quote: char) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(quote);
    for c in name.chars() {
        if c == quote {
            quoted.push(quote);
        }
        quoted.push(c);
    }
    quoted.push(quote);
    quoted
}

/// Renders the parenthesised body of a `CREATE TABLE`: columns and primary key.
pub(crate) fn table_body<D: Dialect + ?Sized>(dialect: &D, schema: &TableSchema) -> SqlResult<String> {
    if schema.columns().is_empty() {
        return Err(SqlError::InvalidStatement {
            message: format!("table '{}' has no columns", schema.name()),
        });
    }

    let mut parts: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| {
            format!(
                "{} {} {}",
                dialect.quote_identifier(&c.name),
                dialect.column_type(c.ty),
                if c.nullable { "NULL" } else { "NOT NULL" }
            )
        })
        .collect();

    if !schema.primary_key().is_empty() {
        for key in schema.primary_key() {
            if schema.column(key).is_none() {
                return Err(SqlError::InvalidStatement {
                    message: format!(
                        "primary key column '{}' is not defined on '{}'",
                        key,
                        schema.name()
                    ),
                });
            }
        }
        parts.push(format!(
            "PRIMARY KEY ({})",
            quoted_list(dialect, schema.primary_key())
        ));
    }

    Ok(parts.join(", "))
}

/// Quotes and comma-joins identifiers.
pub(crate) fn quoted_list<D: Dialect + ?Sized>(dialect: &D, names: &[String]) -> String {
    names
        .iter()
        .map(|n| dialect.quote_identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the keep-max merge for one column:
/// `CASE WHEN <old> IS NULL OR <new> > <old> THEN <new> ELSE <old> END`.
pub(crate) fn keep_max_case(existing: &str, incoming: &str) -> String {
    format!(
        "CASE WHEN {existing} IS NULL OR {incoming} > {existing} THEN {incoming} ELSE {existing} END"
    )
}

/// Validates the key and column lists of a conflict clause.
pub(crate) fn check_conflict(conflict: &OnConflict) -> SqlResult<(&[String], &[String])> {
    match conflict {
        OnConflict::KeepMax { key, columns } => {
            if key.is_empty() {
                return Err(SqlError::InvalidStatement {
                    message: "conflict clause has no key columns".to_string(),
                });
            }
            if columns.is_empty() {
                return Err(SqlError::InvalidStatement {
                    message: "conflict clause has no columns to merge".to_string(),
                });
            }
            Ok((key, columns))
        }
    }
}
