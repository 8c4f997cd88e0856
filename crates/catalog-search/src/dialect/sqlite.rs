//! SQLite dialect.

use crate::error::{SqlResult, StorageError};
use crate::sql::{OnConflict, SqlType, TableSchema};

use super::{
    check_conflict, keep_max_case, quote_with, quoted_list, table_body, Dialect, DialectKind,
    TempTableScope,
};

/// The embedded dialect, spoken by SQLite.
///
/// Timestamps are stored as fixed-width UTC text (see
/// [`TIMESTAMP_TEXT_FORMAT`](crate::sql::TIMESTAMP_TEXT_FORMAT)), so
/// comparisons on them stay chronological.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Embedded
    }

    fn placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '"')
    }

    fn column_type(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Identifier | SqlType::Text | SqlType::Timestamp => "TEXT",
            SqlType::BigInt | SqlType::Boolean => "INTEGER",
            SqlType::Float64 => "REAL",
        }
    }

    fn temporary_table_scope(&self) -> TempTableScope {
        TempTableScope::Connection
    }

    fn temporary_table_ddl(&self, schema: &TableSchema) -> SqlResult<String> {
        Ok(format!(
            "CREATE TEMP TABLE {} ({})",
            self.quote_identifier(schema.name()),
            table_body(self, schema)?
        ))
    }

    fn index_ddl(&self, index_name: &str, table: &str, columns: &[String]) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            self.quote_identifier(index_name),
            self.quote_identifier(table),
            quoted_list(self, columns)
        )
    }

    fn index_already_exists(&self, error: &StorageError) -> bool {
        error
            .backend_message()
            .is_some_and(|m| m.contains("already exists") && m.contains("index"))
    }

    fn upsert_clause(&self, _table: &str, conflict: &OnConflict) -> SqlResult<String> {
        let (key, columns) = check_conflict(conflict)?;
        let assignments = columns
            .iter()
            .map(|c| {
                let column = self.quote_identifier(c);
                let incoming = format!("excluded.{}", column);
                format!("{} = {}", column, keep_max_case(&column, &incoming))
            })
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "ON CONFLICT ({}) DO UPDATE SET {}",
            quoted_list(self, key),
            assignments
        ))
    }

    fn max_bind_parameters(&self) -> usize {
        // SQLITE_MAX_VARIABLE_NUMBER on builds older than 3.32.
        999
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ColumnDef;

    #[test]
    fn test_temporary_table_ddl() {
        let schema = TableSchema::new("staged")
            .with_column(ColumnDef::new("id", SqlType::Identifier))
            .with_column(ColumnDef::nullable("score", SqlType::Float64))
            .with_primary_key(["id"])
            .temporary();
        assert_eq!(
            SqliteDialect.temporary_table_ddl(&schema).unwrap(),
            "CREATE TEMP TABLE \"staged\" (\"id\" TEXT NOT NULL, \"score\" REAL NULL, PRIMARY KEY (\"id\"))"
        );
    }

    #[test]
    fn test_upsert_clause() {
        let clause = SqliteDialect
            .upsert_clause(
                "staged",
                &OnConflict::KeepMax {
                    key: vec!["id".to_string()],
                    columns: vec!["score".to_string()],
                },
            )
            .unwrap();
        assert_eq!(
            clause,
            "ON CONFLICT (\"id\") DO UPDATE SET \"score\" = CASE WHEN \"score\" IS NULL OR excluded.\"score\" > \"score\" THEN excluded.\"score\" ELSE \"score\" END"
        );
    }

    #[test]
    fn test_placeholders_are_numbered() {
        assert_eq!(SqliteDialect.placeholder(1), "?1");
        assert_eq!(SqliteDialect.placeholder(12), "?12");
        assert_eq!(SqliteDialect.max_bind_parameters(), 999);
    }
}
