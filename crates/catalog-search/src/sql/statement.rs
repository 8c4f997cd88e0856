//! Statement trees: `SELECT`, `INSERT`, `CREATE TABLE`, `CREATE INDEX` and `DROP TABLE`.

use super::expr::{Expr, OrderBy};
use super::schema::{ColumnRef, Relation, TableSchema};
use super::value::{SqlType, SqlValue};

/// One projected column of a `SELECT`.
///
/// The declared type tells backends how to decode the column.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// The projected expression.
    pub expr: Expr,
    /// Optional output alias.
    pub alias: Option<String>,
    /// Logical type of the output column.
    pub ty: SqlType,
}

impl Projection {
    /// Projects an expression with the given output type.
    pub fn new(expr: impl Into<Expr>, ty: SqlType) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
            ty,
        }
    }

    /// Projects a column reference.
    pub fn column(column: ColumnRef, ty: SqlType) -> Self {
        Self::new(Expr::Column(column), ty)
    }

    /// Sets the output alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
}

/// A join clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join flavour.
    pub kind: JoinKind,
    /// The joined relation.
    pub relation: Relation,
    /// The join condition.
    pub on: Expr,
}

/// A `SELECT` statement.
///
/// # Examples
///
/// ```
/// use catalog_search::sql::{col, select, OrderBy, Projection, Relation, SqlType};
///
/// let items = Relation::table("items");
/// let query = select([Projection::column(items.col("id"), SqlType::Identifier)])
///     .from(items.clone())
///     .filter(col("tenant_id").eq("acme"))
///     .order_by(OrderBy::asc(items.col("id")))
///     .limit(10);
///
/// assert_eq!(query.column_types(), vec![SqlType::Identifier]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub(crate) projections: Vec<Projection>,
    pub(crate) from: Option<Relation>,
    pub(crate) joins: Vec<Join>,
    pub(crate) filter: Option<Expr>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
}

impl Select {
    /// Sets the `FROM` relation.
    pub fn from(mut self, relation: Relation) -> Self {
        self.from = Some(relation);
        self
    }

    /// Adds an `INNER JOIN`.
    pub fn join(mut self, relation: Relation, on: Expr) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            relation,
            on,
        });
        self
    }

    /// Adds a `LEFT JOIN`.
    pub fn left_join(mut self, relation: Relation, on: Expr) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            relation,
            on,
        });
        self
    }

    /// Adds a `WHERE` predicate, ANDed with any existing one.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Appends an `ORDER BY` term.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Sets `LIMIT`.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets `OFFSET`.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns the projections.
    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// Returns the current `WHERE` predicate.
    pub fn predicate(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    /// Returns the declared output types, in projection order.
    pub fn column_types(&self) -> Vec<SqlType> {
        self.projections.iter().map(|p| p.ty).collect()
    }

    /// Returns a copy with a different projection list and no ordering or paging.
    ///
    /// Used to derive `COUNT(*)` queries from a row query.
    pub fn with_projections(&self, projections: Vec<Projection>) -> Self {
        Self {
            projections,
            from: self.from.clone(),
            joins: self.joins.clone(),
            filter: self.filter.clone(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// Starts a `SELECT` with the given projections.
pub fn select<I>(projections: I) -> Select
where
    I: IntoIterator<Item = Projection>,
{
    Select {
        projections: projections.into_iter().collect(),
        ..Default::default()
    }
}

/// Conflict handling for `INSERT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnConflict {
    /// On a key conflict, keep the larger of the existing and incoming value
    /// for each listed column. A null on either side loses to a non-null.
    KeepMax {
        /// The conflict key columns.
        key: Vec<String>,
        /// The columns to merge.
        columns: Vec<String>,
    },
}

/// A multi-row `INSERT`.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<SqlValue>>,
    pub(crate) on_conflict: Option<OnConflict>,
}

impl Insert {
    /// Sets the conflict handling.
    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }

    /// Returns the target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of bind parameters the statement needs.
    pub fn param_count(&self) -> usize {
        self.rows.len() * self.columns.len()
    }

    /// Splits the insert so no piece needs more than `max_params` parameters.
    ///
    /// Every piece carries at least one row, so a single row wider than the
    /// cap is left for the renderer to reject.
    pub fn split(self, max_params: usize) -> Vec<Insert> {
        let width = self.columns.len().max(1);
        let rows_per_statement = (max_params / width).max(1);
        if self.rows.len() <= rows_per_statement {
            return vec![self];
        }

        let Insert {
            table,
            columns,
            rows,
            on_conflict,
        } = self;

        let mut pieces = Vec::with_capacity(rows.len().div_ceil(rows_per_statement));
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            pieces.push(Insert {
                table: table.clone(),
                columns: columns.clone(),
                rows: rows.by_ref().take(rows_per_statement).collect(),
                on_conflict: on_conflict.clone(),
            });
        }
        pieces
    }
}

/// Starts a multi-row `INSERT INTO table (columns) VALUES rows`.
pub fn insert_all<C, S>(table: impl Into<String>, columns: C, rows: Vec<Vec<SqlValue>>) -> Insert
where
    C: IntoIterator<Item = S>,
    S: Into<String>,
{
    Insert {
        table: table.into(),
        columns: columns.into_iter().map(Into::into).collect(),
        rows,
        on_conflict: None,
    }
}

/// A `CREATE TABLE`. Temporary schemas use the dialect's temporary table syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub(crate) schema: TableSchema,
    pub(crate) if_not_exists: bool,
}

impl CreateTable {
    /// Adds `IF NOT EXISTS` (ignored for temporary tables).
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

/// Starts a `CREATE TABLE` for the given schema.
pub fn create_table(schema: TableSchema) -> CreateTable {
    CreateTable {
        schema,
        if_not_exists: false,
    }
}

/// A `CREATE INDEX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndex {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
}

impl CreateIndex {
    /// Overrides the generated index name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the index name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Starts a `CREATE INDEX` named `idx_<table>_<first column>`.
pub fn create_index<C, S>(table: impl Into<String>, columns: C) -> CreateIndex
where
    C: IntoIterator<Item = S>,
    S: Into<String>,
{
    let table = table.into();
    let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
    let suffix = columns.first().map(String::as_str).unwrap_or("cols");
    CreateIndex {
        name: format!("idx_{}_{}", table, suffix),
        table,
        columns,
    }
}

/// A `DROP TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub(crate) name: String,
    pub(crate) if_exists: bool,
    pub(crate) temporary: bool,
}

impl DropTable {
    /// Drops a temporary table.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }
}

/// Starts a `DROP TABLE IF EXISTS`.
pub fn drop_table(name: impl Into<String>) -> DropTable {
    DropTable {
        name: name.into(),
        if_exists: true,
        temporary: false,
    }
}

/// Any renderable statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `SELECT`
    Select(Select),
    /// `INSERT`
    Insert(Insert),
    /// `CREATE TABLE`
    CreateTable(CreateTable),
    /// `CREATE INDEX`
    CreateIndex(CreateIndex),
    /// `DROP TABLE`
    DropTable(DropTable),
}

impl From<Select> for Statement {
    fn from(s: Select) -> Self {
        Statement::Select(s)
    }
}

impl From<Insert> for Statement {
    fn from(i: Insert) -> Self {
        Statement::Insert(i)
    }
}

impl From<CreateTable> for Statement {
    fn from(c: CreateTable) -> Self {
        Statement::CreateTable(c)
    }
}

impl From<CreateIndex> for Statement {
    fn from(c: CreateIndex) -> Self {
        Statement::CreateIndex(c)
    }
}

impl From<DropTable> for Statement {
    fn from(d: DropTable) -> Self {
        Statement::DropTable(d)
    }
}
