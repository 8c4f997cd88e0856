//! The catalog `items` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Session;
use crate::error::StorageResult;
use crate::sql::{
    create_index, create_table, insert_all, ColumnDef, ColumnRef, Expr, Relation, SqlType,
    SqlValue, TableSchema,
};
use crate::staging::ensure_index;
use crate::types::{ItemId, TenantId};

/// Name of the catalog table.
pub const CATALOG_TABLE: &str = "items";

/// The filterable columns of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemColumn {
    /// `id`, the primary key.
    Id,
    /// `tenant_id`
    TenantId,
    /// `title`
    Title,
    /// `created_at`
    CreatedAt,
    /// `updated_at`
    UpdatedAt,
    /// `deleted_at`, null while the item is live.
    DeletedAt,
}

impl ItemColumn {
    /// Every column, in table order.
    pub const ALL: [ItemColumn; 6] = [
        ItemColumn::Id,
        ItemColumn::TenantId,
        ItemColumn::Title,
        ItemColumn::CreatedAt,
        ItemColumn::UpdatedAt,
        ItemColumn::DeletedAt,
    ];

    /// Returns the column name.
    pub fn name(&self) -> &'static str {
        match self {
            ItemColumn::Id => "id",
            ItemColumn::TenantId => "tenant_id",
            ItemColumn::Title => "title",
            ItemColumn::CreatedAt => "created_at",
            ItemColumn::UpdatedAt => "updated_at",
            ItemColumn::DeletedAt => "deleted_at",
        }
    }

    /// Returns the logical column type.
    pub fn sql_type(&self) -> SqlType {
        match self {
            ItemColumn::Id | ItemColumn::TenantId => SqlType::Identifier,
            ItemColumn::Title => SqlType::Text,
            ItemColumn::CreatedAt | ItemColumn::UpdatedAt | ItemColumn::DeletedAt => {
                SqlType::Timestamp
            }
        }
    }

    /// Returns a reference to the column, qualified with the catalog table.
    pub fn column_ref(&self) -> ColumnRef {
        ColumnRef::qualified(CATALOG_TABLE, self.name())
    }
}

/// Returns a catalog column as an expression, for building filters.
///
/// ```
/// use catalog_search::catalog::{column, ItemColumn};
///
/// let filter = column(ItemColumn::Title).like("%pump%");
/// # let _ = filter;
/// ```
pub fn column(column: ItemColumn) -> Expr {
    Expr::Column(column.column_ref())
}

/// A catalog item, as seeded into the catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Item id.
    pub id: ItemId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display title.
    pub title: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
    /// Deletion instant, if the item was deleted.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CatalogItem {
    /// Creates an item that was never modified or deleted.
    pub fn new(
        id: impl Into<ItemId>,
        tenant_id: impl Into<TenantId>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            title: title.into(),
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    /// Sets the modification instant.
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Marks the item as deleted at the given instant.
    pub fn with_deleted_at(mut self, deleted_at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(deleted_at);
        self
    }

    fn into_values(self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.id.into_inner()),
            SqlValue::Text(self.tenant_id.as_str().to_string()),
            SqlValue::Text(self.title),
            SqlValue::Timestamp(self.created_at),
            SqlValue::Timestamp(self.updated_at),
            SqlValue::opt_timestamp(self.deleted_at),
        ]
    }
}

/// Schema management for the catalog table.
pub struct CatalogSchema;

impl CatalogSchema {
    /// Returns the catalog table schema.
    pub fn table() -> TableSchema {
        ItemColumn::ALL
            .iter()
            .fold(TableSchema::new(CATALOG_TABLE), |schema, c| {
                let def = if *c == ItemColumn::DeletedAt {
                    ColumnDef::nullable(c.name(), c.sql_type())
                } else {
                    ColumnDef::new(c.name(), c.sql_type())
                };
                schema.with_column(def)
            })
            .with_primary_key([ItemColumn::Id.name()])
    }

    /// Returns the catalog table as a relation.
    pub fn relation() -> Relation {
        Relation::table(CATALOG_TABLE)
    }

    /// Returns true if a staging table may not use this name.
    pub fn is_reserved(name: &str) -> bool {
        name.eq_ignore_ascii_case(CATALOG_TABLE)
    }

    /// Creates the catalog table and its tenant index if they do not exist.
    pub async fn create<S: Session + ?Sized>(session: &mut S) -> StorageResult<()> {
        session
            .execute_statement(&create_table(Self::table()).if_not_exists().into())
            .await?;
        ensure_index(
            session,
            create_index(
                CATALOG_TABLE,
                [ItemColumn::TenantId.name(), ItemColumn::CreatedAt.name()],
            ),
        )
        .await?;
        tracing::debug!(table = CATALOG_TABLE, "Catalog schema ready");
        Ok(())
    }

    /// Inserts catalog items and returns the driver-reported count.
    pub async fn insert_items<S: Session + ?Sized>(
        session: &mut S,
        items: Vec<CatalogItem>,
    ) -> StorageResult<u64> {
        if items.is_empty() {
            return Ok(0);
        }
        let max_params = session.dialect().max_bind_parameters();
        let columns = ItemColumn::ALL.map(|c| c.name());
        let rows = items.into_iter().map(CatalogItem::into_values).collect();

        let mut reported = 0;
        for piece in insert_all(CATALOG_TABLE, columns, rows).split(max_params) {
            reported += session.execute_statement(&piece.into()).await?;
        }
        Ok(reported)
    }
}
