//! MySQL dialect.

use crate::error::{SqlResult, StorageError};
use crate::sql::{OnConflict, SqlType, TableSchema};

use super::{
    check_conflict, keep_max_case, quote_with, quoted_list, table_body, Dialect, DialectKind,
    TempTableScope,
};

/// Server error code for `ER_DUP_KEYNAME`.
const DUPLICATE_KEY_NAME: &str = "1061";

/// The weak row-count dialect, spoken by MySQL and MariaDB.
///
/// - `ON DUPLICATE KEY UPDATE` reports 2 for an updated row and 0 for an
///   unchanged one, so bulk insert counts are not row counts.
/// - Temporary tables live as long as the connection.
/// - `CREATE INDEX` has no `IF NOT EXISTS` and implicitly commits.
/// - `ORDER BY` has no `NULLS FIRST` / `NULLS LAST`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::WeakRowCount
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '`')
    }

    fn column_type(&self, ty: SqlType) -> &'static str {
        match ty {
            // TEXT columns cannot be keys without a prefix length.
            SqlType::Identifier => "VARCHAR(255)",
            SqlType::Text => "TEXT",
            SqlType::BigInt => "BIGINT",
            SqlType::Float64 => "DOUBLE",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Timestamp => "DATETIME(6)",
        }
    }

    fn temporary_table_scope(&self) -> TempTableScope {
        TempTableScope::Connection
    }

    fn temporary_table_ddl(&self, schema: &TableSchema) -> SqlResult<String> {
        Ok(format!(
            "CREATE TEMPORARY TABLE {} ({})",
            self.quote_identifier(schema.name()),
            table_body(self, schema)?
        ))
    }

    fn drop_table_ddl(&self, name: &str, if_exists: bool, temporary: bool) -> String {
        // DROP TEMPORARY TABLE never commits and never touches a permanent table.
        let keyword = if temporary { "DROP TEMPORARY TABLE" } else { "DROP TABLE" };
        if if_exists {
            format!("{} IF EXISTS {}", keyword, self.quote_identifier(name))
        } else {
            format!("{} {}", keyword, self.quote_identifier(name))
        }
    }

    fn index_ddl(&self, index_name: &str, table: &str, columns: &[String]) -> String {
        format!(
            "CREATE INDEX {} ON {} ({})",
            self.quote_identifier(index_name),
            self.quote_identifier(table),
            quoted_list(self, columns)
        )
    }

    fn index_already_exists(&self, error: &StorageError) -> bool {
        error
            .backend_message()
            .is_some_and(|m| m.contains(DUPLICATE_KEY_NAME) || m.contains("Duplicate key name"))
    }

    fn index_ddl_commits(&self) -> bool {
        true
    }

    fn bulk_insert_reliable_row_count(&self) -> bool {
        false
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn upsert_clause(&self, _table: &str, conflict: &OnConflict) -> SqlResult<String> {
        let (_key, columns) = check_conflict(conflict)?;
        let assignments = columns
            .iter()
            .map(|c| {
                let column = self.quote_identifier(c);
                let incoming = format!("VALUES({})", column);
                format!("{} = {}", column, keep_max_case(&column, &incoming))
            })
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("ON DUPLICATE KEY UPDATE {}", assignments))
    }

    fn max_bind_parameters(&self) -> usize {
        65535
    }

    fn begin_statement(&self) -> &'static str {
        "START TRANSACTION"
    }
}
