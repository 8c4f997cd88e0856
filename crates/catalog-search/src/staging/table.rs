//! Session-scoped temporary tables holding staged search results.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSchema;
use crate::core::Session;
use crate::error::{BackendError, StorageError, StorageResult, TableError};
use crate::sql::{
    create_index, create_table, insert_all, select, ColumnDef, ColumnRef, CreateIndex, OnConflict,
    OrderBy, Projection, Relation, Select, SqlType, SqlValue, Statement, TableSchema,
};
use crate::types::ItemId;

use super::window::FlushWindow;
use super::MAX_TABLE_NAME_LEN;

static TABLE_NAME_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"));

/// The fixed column layout of a staging table.
pub struct StagingSchema;

impl StagingSchema {
    /// Item id; the primary key.
    pub const ID: &'static str = "id";
    /// Best score of any match on the item.
    pub const PRIMARY_SCORE: &'static str = "primary_score";
    /// Best score among the item's attachment matches.
    pub const SECONDARY_SCORE: &'static str = "secondary_score";

    /// Returns the column names in insert order.
    pub fn columns() -> [&'static str; 3] {
        [Self::ID, Self::PRIMARY_SCORE, Self::SECONDARY_SCORE]
    }

    /// Returns the temporary table schema under the given name.
    pub fn table(name: &str) -> TableSchema {
        TableSchema::new(name)
            .with_column(ColumnDef::new(Self::ID, SqlType::Identifier))
            .with_column(ColumnDef::nullable(Self::PRIMARY_SCORE, SqlType::Float64))
            .with_column(ColumnDef::nullable(Self::SECONDARY_SCORE, SqlType::Float64))
            .with_primary_key([Self::ID])
            .temporary()
    }

    fn keep_max() -> OnConflict {
        OnConflict::KeepMax {
            key: vec![Self::ID.to_string()],
            columns: vec![
                Self::PRIMARY_SCORE.to_string(),
                Self::SECONDARY_SCORE.to_string(),
            ],
        }
    }
}

/// One row of a staging table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingRow {
    /// The catalog item id.
    pub id: ItemId,
    /// Best score of any match on the item.
    pub primary_score: Option<f64>,
    /// Best score among attachment matches only.
    pub secondary_score: Option<f64>,
}

impl StagingRow {
    /// Creates a staging row.
    pub fn new(
        id: impl Into<ItemId>,
        primary_score: Option<f64>,
        secondary_score: Option<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            primary_score,
            secondary_score,
        }
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.id.into_inner()),
            SqlValue::opt_float(self.primary_score),
            SqlValue::opt_float(self.secondary_score),
        ]
    }
}

/// The result of a bulk insert.
///
/// `reported` is the driver's affected row count. It equals the number of
/// rows written only when `reliable` is true; MySQL counts an upsert that
/// updated a row twice and one that changed nothing zero times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOutcome {
    /// Affected rows as reported by the driver.
    pub reported: u64,
    /// Whether `reported` can be trusted as a row count.
    pub reliable: bool,
}

/// Returns a fresh table name of the form `<prefix>_<32 hex digits>`.
pub fn unique_table_name(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Creates staging tables inside a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporaryTableManager;

impl TemporaryTableManager {
    /// Creates a manager.
    pub fn new() -> Self {
        Self
    }

    /// Creates an empty staging table named `name` and registers it with the
    /// session for teardown.
    pub async fn create_table<S: Session + ?Sized>(
        &self,
        session: &mut S,
        name: &str,
    ) -> StorageResult<StagedTable> {
        validate_table_name(name)?;
        if session.has_relation(name) || CatalogSchema::is_reserved(name) {
            return Err(TableError::NameCollision {
                name: name.to_string(),
            }
            .into());
        }

        let dialect = session.dialect();
        let statement: Statement = create_table(StagingSchema::table(name)).into();
        session.execute_statement(&statement).await.map_err(|e| {
            StorageError::Table(TableError::CreationFailed {
                name: name.to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })
        })?;
        session.register_temporary_table(name);

        tracing::debug!(table = %name, dialect = %dialect.name(), "Created staging table");

        Ok(StagedTable {
            name: name.to_string(),
            reported_rows: 0,
            reliable_counts: dialect.bulk_insert_reliable_row_count(),
            indexed: false,
        })
    }

    /// Creates a staging table under a fresh name built from `prefix`.
    pub async fn create_unique_table<S: Session + ?Sized>(
        &self,
        session: &mut S,
        prefix: &str,
    ) -> StorageResult<StagedTable> {
        self.create_table(session, &unique_table_name(prefix)).await
    }
}

fn validate_table_name(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| {
        StorageError::Table(TableError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.len() > MAX_TABLE_NAME_LEN {
        return Err(invalid(&format!(
            "longer than {} characters",
            MAX_TABLE_NAME_LEN
        )));
    }
    let pattern = TABLE_NAME_PATTERN.as_ref().map_err(|e| {
        StorageError::Backend(BackendError::Internal {
            backend_name: "staging".to_string(),
            message: e.to_string(),
        })
    })?;
    if !pattern.is_match(name) {
        return Err(invalid(
            "must start with a letter or underscore and contain only letters, digits and underscores",
        ));
    }
    Ok(())
}

/// Creates an index, treating an existing index of the same name as success.
///
/// Reopens the session's transaction when the dialect commits on index DDL.
pub(crate) async fn ensure_index<S: Session + ?Sized>(
    session: &mut S,
    index: CreateIndex,
) -> StorageResult<()> {
    let dialect = session.dialect();
    let name = index.name().to_string();
    let result = session.execute_statement(&index.into()).await;

    if dialect.index_ddl_commits() {
        session.begin().await?;
    }

    match result {
        Ok(_) => {
            tracing::debug!(index = %name, "Created index");
            Ok(())
        }
        Err(e) if dialect.index_already_exists(&e) => {
            tracing::debug!(index = %name, "Index already exists, skipping");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// A staging table owned by one session.
///
/// Only the mutable handle can insert or index; once staging hands it out
/// behind a shared reference it is read-only.
#[derive(Debug)]
pub struct StagedTable {
    name: String,
    reported_rows: u64,
    reliable_counts: bool,
    indexed: bool,
}

impl StagedTable {
    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table as a joinable relation.
    pub fn relation(&self) -> Relation {
        Relation::table(&self.name)
    }

    /// Returns a column of this table.
    pub fn col(&self, name: &str) -> ColumnRef {
        ColumnRef::qualified(&self.name, name)
    }

    /// Returns the sum of driver-reported counts of every insert so far.
    pub fn reported_rows(&self) -> u64 {
        self.reported_rows
    }

    /// Returns true if [`reported_rows`](Self::reported_rows) is a row count.
    pub fn row_count_reliable(&self) -> bool {
        self.reliable_counts
    }

    /// Returns true once the lookup index has been built.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Inserts rows, keeping the larger score when an id is already staged.
    ///
    /// Rows sharing an id are merged before the insert, since a single
    /// PostgreSQL upsert cannot touch the same row twice. The insert is split
    /// so no statement exceeds the dialect's bind parameter cap.
    pub async fn insert_all<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        rows: Vec<StagingRow>,
    ) -> StorageResult<InsertOutcome> {
        let mut outcome = InsertOutcome {
            reported: 0,
            reliable: self.reliable_counts,
        };
        if rows.is_empty() {
            return Ok(outcome);
        }

        let mut window = FlushWindow::new();
        rows.into_iter().for_each(|row| window.push(row));

        let max_params = session.dialect().max_bind_parameters();
        let values = window
            .drain()
            .into_iter()
            .map(StagingRow::into_values)
            .collect();
        let insert = insert_all(&self.name, StagingSchema::columns(), values)
            .on_conflict(StagingSchema::keep_max());

        for piece in insert.split(max_params) {
            outcome.reported += session.execute_statement(&piece.into()).await?;
        }

        self.reported_rows += outcome.reported;
        Ok(outcome)
    }

    /// Builds the lookup index on `id`. Calling it again is a no-op.
    pub async fn create_index<S: Session + ?Sized>(&mut self, session: &mut S) -> StorageResult<()> {
        ensure_index(session, create_index(&self.name, [StagingSchema::ID])).await?;
        self.indexed = true;
        Ok(())
    }

    /// Returns a query over every staged row, ordered by id.
    pub fn select_all(&self) -> Select {
        select([
            Projection::column(self.col(StagingSchema::ID), SqlType::Identifier),
            Projection::column(self.col(StagingSchema::PRIMARY_SCORE), SqlType::Float64),
            Projection::column(self.col(StagingSchema::SECONDARY_SCORE), SqlType::Float64),
        ])
        .from(self.relation())
        .order_by(OrderBy::asc(self.col(StagingSchema::ID)))
    }

    /// Reads every staged row, ordered by id.
    pub async fn read_all<S: Session + ?Sized>(&self, session: &mut S) -> StorageResult<Vec<StagingRow>> {
        let rows = session.query_statement(&self.select_all().into()).await?;
        rows.iter()
            .map(|row| {
                Ok(StagingRow {
                    id: ItemId::new(row.get_text(0)?),
                    primary_score: row.get_opt_f64(1)?,
                    secondary_score: row.get_opt_f64(2)?,
                })
            })
            .collect()
    }
}
