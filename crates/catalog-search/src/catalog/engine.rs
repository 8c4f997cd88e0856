//! The item query join engine.

use chrono::{DateTime, Utc};

use crate::config::QueryConfig;
use crate::core::Session;
use crate::error::{BackendError, StorageError, StorageResult};
use crate::sql::{and_all, lit, select, Expr, OrderBy, Projection, Renderer, Select, SqlType};
use crate::staging::{StagedResults, StagedTable, StagingSchema};
use crate::types::BatchSpec;

use super::cursor::ResultCursor;
use super::query::QuerySpec;
use super::schema::{column, CatalogSchema, ItemColumn};

/// Builds and runs catalog queries, optionally joined with staged search results.
///
/// Without a staged table rows are ordered newest first. With one, rows are
/// ordered by relevance with missing scores last, then newest first. The
/// item id is always the final tie-break, so pagination is deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemQueryEngine {
    config: QueryConfig,
}

impl ItemQueryEngine {
    /// Creates an engine.
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Returns the query configuration.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Returns the batch that will actually be served, with the limit clamped.
    pub fn effective_batch(&self, batch: BatchSpec) -> BatchSpec {
        batch.clamped(self.config.max_limit)
    }

    /// Builds the unpaginated query.
    pub fn build_select(
        &self,
        spec: &QuerySpec,
        as_of: DateTime<Utc>,
        utc_offset_minutes: i32,
        staged: Option<&StagedTable>,
    ) -> Select {
        let item_columns = [
            ItemColumn::Id,
            ItemColumn::TenantId,
            ItemColumn::Title,
            ItemColumn::CreatedAt,
            ItemColumn::UpdatedAt,
        ];
        let mut projections: Vec<Projection> = item_columns
            .iter()
            .map(|c| Projection::column(c.column_ref(), c.sql_type()))
            .collect();

        if let Some(table) = staged {
            projections.push(Projection::column(
                table.col(StagingSchema::PRIMARY_SCORE),
                SqlType::Float64,
            ));
            projections.push(Projection::column(
                table.col(StagingSchema::SECONDARY_SCORE),
                SqlType::Float64,
            ));
        }

        let mut query = select(projections).from(CatalogSchema::relation());
        if let Some(predicate) = and_all(Self::predicates(spec, as_of, utc_offset_minutes)) {
            query = query.filter(predicate);
        }

        match staged {
            Some(table) => {
                let score = Expr::Column(table.col(StagingSchema::PRIMARY_SCORE));
                query
                    .join(
                        table.relation(),
                        column(ItemColumn::Id).eq(table.col(StagingSchema::ID)),
                    )
                    .order_by(OrderBy::asc(score.clone().is_null()))
                    .order_by(OrderBy::desc(score))
                    .order_by(OrderBy::desc(column(ItemColumn::CreatedAt)))
                    .order_by(OrderBy::asc(column(ItemColumn::Id)))
            }
            None => query
                .order_by(OrderBy::desc(column(ItemColumn::CreatedAt)))
                .order_by(OrderBy::asc(column(ItemColumn::Id))),
        }
    }

    fn predicates(spec: &QuerySpec, as_of: DateTime<Utc>, utc_offset_minutes: i32) -> Vec<Expr> {
        let mut predicates = vec![
            column(ItemColumn::TenantId).eq(lit(spec.tenant_id.as_str())),
            column(ItemColumn::CreatedAt).lt_eq(as_of),
            column(ItemColumn::DeletedAt)
                .is_null()
                .or(column(ItemColumn::DeletedAt).gt(as_of)),
        ];

        if let Some(range) = &spec.date_range {
            let (start, end) = range.to_utc_bounds(utc_offset_minutes);
            if let Some(start) = start {
                predicates.push(column(ItemColumn::CreatedAt).gt_eq(start));
            }
            if let Some(end) = end {
                predicates.push(column(ItemColumn::CreatedAt).lt(end));
            }
        }

        if let Some(filter) = &spec.filter {
            predicates.push(filter.clone());
        }
        predicates
    }

    /// Opens a cursor over one batch of matching items.
    ///
    /// The query is rendered once up front so dialect errors surface here
    /// rather than on the first pull.
    pub async fn query_items<'s, S: Session + ?Sized>(
        &self,
        session: &'s mut S,
        spec: &QuerySpec,
        as_of: DateTime<Utc>,
        utc_offset_minutes: i32,
        batch: BatchSpec,
        staged: Option<&'s StagedResults>,
    ) -> StorageResult<ResultCursor<'s, S>> {
        let batch = self.effective_batch(batch);
        let query = self.build_select(spec, as_of, utc_offset_minutes, staged.map(|s| s.table()));
        Renderer::render(&query.clone().limit(batch.limit).into(), session.dialect())?;

        tracing::debug!(
            tenant = %spec.tenant_id,
            offset = batch.offset,
            limit = batch.limit,
            staged = staged.is_some(),
            "Opening item cursor"
        );

        Ok(ResultCursor::new(
            session,
            query,
            staged,
            batch,
            self.config.fetch_size,
        ))
    }

    /// Counts every item the query would return across all batches.
    pub async fn count_items<S: Session + ?Sized>(
        &self,
        session: &mut S,
        spec: &QuerySpec,
        as_of: DateTime<Utc>,
        utc_offset_minutes: i32,
        staged: Option<&StagedResults>,
    ) -> StorageResult<u64> {
        let query = self
            .build_select(spec, as_of, utc_offset_minutes, staged.map(|s| s.table()))
            .with_projections(vec![Projection::new(Expr::CountAll, SqlType::BigInt)]);

        let rows = session.query_statement(&query.into()).await?;
        let count = rows
            .first()
            .ok_or_else(|| {
                StorageError::Backend(BackendError::Internal {
                    backend_name: session.dialect().name().to_string(),
                    message: "COUNT(*) returned no rows".to_string(),
                })
            })?
            .get_i64(0)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DateRange;
    use crate::dialect::DialectKind;
    use chrono::{NaiveDate, TimeZone};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_unstaged_query_shape() {
        let engine = ItemQueryEngine::default();
        let query = engine
            .build_select(&QuerySpec::new("acme"), as_of(), 0, None)
            .offset(20)
            .limit(10);
        let rendered = Renderer::render(&query.into(), DialectKind::Strict.adapter()).unwrap();

        assert_eq!(
            rendered.sql,
            "SELECT \"items\".\"id\", \"items\".\"tenant_id\", \"items\".\"title\", \
             \"items\".\"created_at\", \"items\".\"updated_at\" FROM \"items\" \
             WHERE \"items\".\"tenant_id\" = $1 AND \"items\".\"created_at\" <= $2 \
             AND (\"items\".\"deleted_at\" IS NULL OR \"items\".\"deleted_at\" > $3) \
             ORDER BY \"items\".\"created_at\" DESC, \"items\".\"id\" ASC LIMIT $4 OFFSET $5"
        );
        assert_eq!(rendered.params.len(), 5);
        assert_eq!(rendered.columns.len(), 5);
    }

    #[test]
    fn test_date_range_and_filter_predicates() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let spec = QuerySpec::new("acme")
            .with_date_range(DateRange::between(day, day))
            .with_filter(column(ItemColumn::Title).like("%pump%"));
        let predicates = ItemQueryEngine::predicates(&spec, as_of(), 60);
        assert_eq!(predicates.len(), 6);
        assert_eq!(
            predicates[3],
            column(ItemColumn::CreatedAt).gt_eq(Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_staged_query_renders_on_every_dialect() {
        // A staged table can only come from a session; build the join by hand.
        let query = select([Projection::column(ItemColumn::Id.column_ref(), SqlType::Identifier)])
            .from(CatalogSchema::relation())
            .join(
                crate::sql::Relation::table("staged"),
                column(ItemColumn::Id).eq(crate::sql::ColumnRef::qualified("staged", "id")),
            )
            .order_by(OrderBy::asc(
                Expr::Column(crate::sql::ColumnRef::qualified("staged", "primary_score")).is_null(),
            ));
        for kind in DialectKind::ALL {
            let rendered = Renderer::render(&query.clone().into(), kind.adapter()).unwrap();
            assert!(rendered.sql.contains("IS NULL ASC"), "{}", rendered.sql);
        }
    }

    #[test]
    fn test_limit_is_clamped() {
        let engine = ItemQueryEngine::new(QueryConfig {
            max_limit: 50,
            ..Default::default()
        });
        assert_eq!(engine.effective_batch(BatchSpec::new(0, 500)).limit, 50);
    }
}
