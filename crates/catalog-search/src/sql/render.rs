//! Rendering statement trees to SQL text plus bound parameters.

use crate::dialect::{quoted_list, Dialect};
use crate::error::{SqlError, SqlResult};

use super::expr::{Expr, NullsOrder, OrderBy, SortDirection};
use super::schema::{ColumnRef, Relation};
use super::statement::{
    CreateIndex, CreateTable, DropTable, Insert, JoinKind, Select, Statement,
};
use super::value::{SqlType, SqlValue};

/// SQL text ready to execute, with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    /// The statement text.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<SqlValue>,
    /// Declared output column types, for statements that return rows.
    pub columns: Vec<SqlType>,
}

impl RenderedSql {
    /// Wraps a parameterless statement.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            columns: Vec::new(),
        }
    }
}

impl std::fmt::Display for RenderedSql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Renders statements for one dialect.
///
/// Literal values are always emitted as placeholders, including `LIMIT`
/// and `OFFSET`.
pub struct Renderer<'d> {
    dialect: &'d dyn Dialect,
    sql: String,
    params: Vec<SqlValue>,
}

impl<'d> Renderer<'d> {
    /// Renders `statement` for `dialect`.
    pub fn render(statement: &Statement, dialect: &'d dyn Dialect) -> SqlResult<RenderedSql> {
        let mut renderer = Renderer {
            dialect,
            sql: String::with_capacity(256),
            params: Vec::new(),
        };

        let columns = match statement {
            Statement::Select(select) => {
                renderer.select(select)?;
                select.column_types()
            }
            Statement::Insert(insert) => {
                renderer.insert(insert)?;
                Vec::new()
            }
            Statement::CreateTable(create) => {
                renderer.create_table(create)?;
                Vec::new()
            }
            Statement::CreateIndex(index) => {
                renderer.create_index(index)?;
                Vec::new()
            }
            Statement::DropTable(drop) => {
                renderer.drop_table(drop);
                Vec::new()
            }
        };

        if renderer.params.len() > dialect.max_bind_parameters() {
            return Err(SqlError::InvalidStatement {
                message: format!(
                    "statement binds {} parameters, {} allows at most {}",
                    renderer.params.len(),
                    dialect.name(),
                    dialect.max_bind_parameters()
                ),
            });
        }

        Ok(RenderedSql {
            sql: renderer.sql,
            params: renderer.params,
            columns,
        })
    }

    fn bind(&mut self, value: SqlValue) {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn ident(&mut self, name: &str) {
        let quoted = self.dialect.quote_identifier(name);
        self.sql.push_str(&quoted);
    }

    fn column(&mut self, column: &ColumnRef) {
        if let Some(qualifier) = &column.qualifier {
            self.ident(qualifier);
            self.push(".");
        }
        self.ident(&column.name);
    }

    fn relation(&mut self, relation: &Relation) {
        self.ident(relation.name());
        if let Some(alias) = relation.alias_name() {
            self.push(" AS ");
            self.ident(alias);
        }
    }

    fn unsupported(&self, construct: &str) -> SqlError {
        SqlError::UnsupportedConstruct {
            dialect: self.dialect.name(),
            construct: construct.to_string(),
        }
    }

    /// Renders an operand, parenthesising anything that is not atomic.
    fn operand(&mut self, expr: &Expr) -> SqlResult<()> {
        match expr {
            Expr::Column(_)
            | Expr::Value(_)
            | Expr::Coalesce(_)
            | Expr::CountAll
            | Expr::Or(_) => self.expr(expr),
            _ => {
                self.push("(");
                self.expr(expr)?;
                self.push(")");
                Ok(())
            }
        }
    }

    fn expr(&mut self, expr: &Expr) -> SqlResult<()> {
        match expr {
            Expr::Column(column) => self.column(column),
            Expr::Value(value) => self.bind(value.clone()),
            Expr::Binary { left, op, right } => {
                self.operand(left)?;
                self.push(" ");
                self.push(op.as_sql());
                self.push(" ");
                self.operand(right)?;
            }
            Expr::And(terms) => {
                if terms.is_empty() {
                    self.push("1 = 1");
                }
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        self.push(" AND ");
                    }
                    match term {
                        Expr::And(_) => {
                            self.push("(");
                            self.expr(term)?;
                            self.push(")");
                        }
                        _ => self.expr(term)?,
                    }
                }
            }
            Expr::Or(terms) => {
                if terms.is_empty() {
                    self.push("1 = 0");
                    return Ok(());
                }
                self.push("(");
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        self.push(" OR ");
                    }
                    match term {
                        Expr::And(_) => {
                            self.push("(");
                            self.expr(term)?;
                            self.push(")");
                        }
                        _ => self.expr(term)?,
                    }
                }
                self.push(")");
            }
            Expr::Not(inner) => {
                self.push("NOT ");
                match inner.as_ref() {
                    Expr::Or(_) => self.expr(inner)?,
                    other => {
                        self.push("(");
                        self.expr(other)?;
                        self.push(")");
                    }
                }
            }
            Expr::IsNull(inner) => {
                self.operand(inner)?;
                self.push(" IS NULL");
            }
            Expr::IsNotNull(inner) => {
                self.operand(inner)?;
                self.push(" IS NOT NULL");
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    return Err(SqlError::InvalidStatement {
                        message: "IN list is empty".to_string(),
                    });
                }
                self.operand(expr)?;
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(item)?;
                }
                self.push(")");
            }
            Expr::Coalesce(terms) => {
                if terms.is_empty() {
                    return Err(SqlError::InvalidStatement {
                        message: "COALESCE needs at least one argument".to_string(),
                    });
                }
                self.push("COALESCE(");
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(term)?;
                }
                self.push(")");
            }
            Expr::CountAll => self.push("COUNT(*)"),
        }
        Ok(())
    }

    fn order_term(&mut self, order: &OrderBy) -> SqlResult<()> {
        self.expr(&order.expr)?;
        self.push(match order.direction {
            SortDirection::Asc => " ASC",
            SortDirection::Desc => " DESC",
        });
        if let Some(nulls) = order.nulls {
            let construct = match nulls {
                NullsOrder::First => "NULLS FIRST",
                NullsOrder::Last => "NULLS LAST",
            };
            if !self.dialect.supports_nulls_ordering() {
                return Err(self.unsupported(construct));
            }
            self.push(" ");
            self.push(construct);
        }
        Ok(())
    }

    fn select(&mut self, select: &Select) -> SqlResult<()> {
        if select.projections.is_empty() {
            return Err(SqlError::InvalidStatement {
                message: "SELECT has no projections".to_string(),
            });
        }

        self.push("SELECT ");
        for (i, projection) in select.projections.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(&projection.expr)?;
            if let Some(alias) = &projection.alias {
                self.push(" AS ");
                self.ident(alias);
            }
        }

        if let Some(from) = &select.from {
            self.push(" FROM ");
            self.relation(from);
        } else if !select.joins.is_empty() {
            return Err(SqlError::InvalidStatement {
                message: "JOIN without FROM".to_string(),
            });
        }

        for join in &select.joins {
            self.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            self.relation(&join.relation);
            self.push(" ON ");
            self.expr(&join.on)?;
        }

        if let Some(filter) = &select.filter {
            self.push(" WHERE ");
            self.expr(filter)?;
        }

        if !select.order_by.is_empty() {
            self.push(" ORDER BY ");
            for (i, order) in select.order_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.order_term(order)?;
            }
        }

        // MySQL and SQLite reject OFFSET without LIMIT, so an offset alone
        // gets the largest representable limit.
        let limit = match (select.limit, select.offset) {
            (Some(limit), _) => Some(limit),
            (None, Some(_)) => Some(i64::MAX as u64),
            (None, None) => None,
        };
        if let Some(limit) = limit {
            self.push(" LIMIT ");
            self.bind(SqlValue::Integer(clamp_i64(limit)));
        }
        if let Some(offset) = select.offset {
            self.push(" OFFSET ");
            self.bind(SqlValue::Integer(clamp_i64(offset)));
        }

        Ok(())
    }

    fn insert(&mut self, insert: &Insert) -> SqlResult<()> {
        if insert.columns.is_empty() {
            return Err(SqlError::InvalidStatement {
                message: format!("INSERT into '{}' has no columns", insert.table),
            });
        }
        if insert.rows.is_empty() {
            return Err(SqlError::InvalidStatement {
                message: format!("INSERT into '{}' has no rows", insert.table),
            });
        }
        if let Some(row) = insert.rows.iter().find(|r| r.len() != insert.columns.len()) {
            return Err(SqlError::InvalidStatement {
                message: format!(
                    "INSERT into '{}' has {} columns but a row with {} values",
                    insert.table,
                    insert.columns.len(),
                    row.len()
                ),
            });
        }

        self.push("INSERT INTO ");
        self.ident(&insert.table);
        self.push(" (");
        let columns = quoted_list(self.dialect, &insert.columns);
        self.push(&columns);
        self.push(") VALUES ");

        for (i, row) in insert.rows.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push("(");
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    self.push(", ");
                }
                self.bind(value.clone());
            }
            self.push(")");
        }

        if let Some(conflict) = &insert.on_conflict {
            if !self.dialect.supports_upsert() {
                return Err(self.unsupported("ON CONFLICT"));
            }
            let clause = self.dialect.upsert_clause(&insert.table, conflict)?;
            self.push(" ");
            self.push(&clause);
        }

        Ok(())
    }

    fn create_table(&mut self, create: &CreateTable) -> SqlResult<()> {
        let ddl = if create.schema.is_temporary() {
            self.dialect.temporary_table_ddl(&create.schema)?
        } else {
            self.dialect
                .create_table_ddl(&create.schema, create.if_not_exists)?
        };
        self.push(&ddl);
        Ok(())
    }

    fn create_index(&mut self, index: &CreateIndex) -> SqlResult<()> {
        if index.columns.is_empty() {
            return Err(SqlError::InvalidStatement {
                message: format!("index '{}' has no columns", index.name),
            });
        }
        let ddl = self
            .dialect
            .index_ddl(&index.name, &index.table, &index.columns);
        self.push(&ddl);
        Ok(())
    }

    fn drop_table(&mut self, drop: &DropTable) {
        let ddl = self
            .dialect
            .drop_table_ddl(&drop.name, drop.if_exists, drop.temporary);
        self.push(&ddl);
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Renders `statement` for `dialect`.
pub fn render(statement: impl Into<Statement>, dialect: &dyn Dialect) -> SqlResult<RenderedSql> {
    Renderer::render(&statement.into(), dialect)
}
