//! PostgreSQL dialect.

use crate::error::SqlResult;
use crate::sql::{OnConflict, SqlType, TableSchema};

use super::{
    check_conflict, keep_max_case, quote_with, quoted_list, table_body, Dialect, DialectKind,
    TempTableScope,
};

/// The strict dialect, spoken by PostgreSQL.
///
/// Temporary tables are created `ON COMMIT DROP`, so the engine removes
/// them when the session's transaction ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Strict
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '"')
    }

    fn column_type(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Identifier | SqlType::Text => "TEXT",
            SqlType::BigInt => "BIGINT",
            SqlType::Float64 => "DOUBLE PRECISION",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Timestamp => "TIMESTAMPTZ",
        }
    }

    fn temporary_table_scope(&self) -> TempTableScope {
        TempTableScope::Transaction
    }

    fn temporary_table_ddl(&self, schema: &TableSchema) -> SqlResult<String> {
        Ok(format!(
            "CREATE TEMPORARY TABLE {} ({}) ON COMMIT DROP",
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

    fn upsert_clause(&self, table: &str, conflict: &OnConflict) -> SqlResult<String> {
        let (key, columns) = check_conflict(conflict)?;
        let table = self.quote_identifier(table);
        let assignments = columns
            .iter()
            .map(|c| {
                let column = self.quote_identifier(c);
                let existing = format!("{}.{}", table, column);
                let incoming = format!("EXCLUDED.{}", column);
                format!("{} = {}", column, keep_max_case(&existing, &incoming))
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
        // The wire protocol carries the parameter count as an Int16.
        65535
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
            PostgresDialect.temporary_table_ddl(&schema).unwrap(),
            "CREATE TEMPORARY TABLE \"staged\" (\"id\" TEXT NOT NULL, \"score\" DOUBLE PRECISION NULL, PRIMARY KEY (\"id\")) ON COMMIT DROP"
        );
    }

    #[test]
    fn test_upsert_clause() {
        let clause = PostgresDialect
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
            "ON CONFLICT (\"id\") DO UPDATE SET \"score\" = CASE WHEN \"staged\".\"score\" IS NULL OR EXCLUDED.\"score\" > \"staged\".\"score\" THEN EXCLUDED.\"score\" ELSE \"staged\".\"score\" END"
        );
    }

    #[test]
    fn test_index_ddl() {
        assert_eq!(
            PostgresDialect.index_ddl("idx_staged_id", "staged", &["id".to_string()]),
            "CREATE INDEX IF NOT EXISTS \"idx_staged_id\" ON \"staged\" (\"id\")"
        );
        assert_eq!(PostgresDialect.placeholder(3), "$3");
        assert_eq!(PostgresDialect.temporary_table_scope(), TempTableScope::Transaction);
    }
}
