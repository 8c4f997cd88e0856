//! Checks shared by every backend.
//!
//! Each function takes an initialized backend and opens its own sessions,
//! never more than one at a time, so it also runs against a single-connection
//! in-memory SQLite pool.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use futures::StreamExt;

use catalog_search::catalog::{
    column, CatalogItem, DateRange, ItemColumn, ItemQueryEngine, QuerySpec, SearchPipeline,
};
use catalog_search::config::{CatalogSearchConfig, QueryConfig, StagingConfig};
use catalog_search::core::{Backend, Session, SessionState};
use catalog_search::dialect::Dialect;
use catalog_search::error::{BackendError, StagingError, StorageError, StorageResult, TableError};
use catalog_search::sql::{RenderedSql, SqlRow};
use catalog_search::staging::{
    ItemMatch, SearchResultBatch, SearchResultStager, StagingRow, TemporaryTableManager,
};
use catalog_search::types::{BatchSpec, ItemId};

use super::fixtures::*;

fn ids(rows: &[catalog_search::catalog::ResultRow]) -> Vec<String> {
    rows.iter().map(|r| r.id.as_str().to_string()).collect()
}

async fn visible_ids<S: Session>(
    engine: &ItemQueryEngine,
    session: &mut S,
    spec: &QuerySpec,
    utc_offset_minutes: i32,
) -> Vec<String> {
    let rows = engine
        .query_items(session, spec, as_of(), utc_offset_minutes, BatchSpec::first(50), None)
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    ids(&rows)
}

/// Selecting a staged table returns exactly the inserted rows, by id.
pub async fn staged_rows_round_trip<B: Backend>(backend: &B) {
    let mut session = backend.session().await.unwrap();
    let mut table = TemporaryTableManager::new()
        .create_unique_table(&mut session, "roundtrip")
        .await
        .unwrap();

    let rows = vec![
        StagingRow::new("c", Some(3.0), None),
        StagingRow::new("a", Some(1.5), Some(1.5)),
        StagingRow::new("b", None, None),
    ];
    let outcome = table.insert_all(&mut session, rows.clone()).await.unwrap();
    if session.dialect().bulk_insert_reliable_row_count() {
        assert!(outcome.reliable);
        assert_eq!(outcome.reported, 3);
    } else {
        assert!(!outcome.reliable);
    }

    let mut expected = rows;
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(table.read_all(&mut session).await.unwrap(), expected);

    Box::new(session).rollback().await.unwrap();
}

/// Building the index twice leaves contents and session intact.
pub async fn create_index_twice<B: Backend>(backend: &B) {
    let mut session = backend.session().await.unwrap();
    let mut table = TemporaryTableManager::new()
        .create_unique_table(&mut session, "indexed")
        .await
        .unwrap();
    table
        .insert_all(
            &mut session,
            vec![
                StagingRow::new("x", Some(1.0), None),
                StagingRow::new("y", Some(2.0), None),
            ],
        )
        .await
        .unwrap();

    table.create_index(&mut session).await.unwrap();
    let before = table.read_all(&mut session).await.unwrap();
    table.create_index(&mut session).await.unwrap();
    assert!(table.is_indexed());
    assert_eq!(table.read_all(&mut session).await.unwrap(), before);

    assert_usable(&mut session).await;
    table
        .insert_all(&mut session, vec![StagingRow::new("z", Some(0.5), None)])
        .await
        .unwrap();
    assert_eq!(table.read_all(&mut session).await.unwrap().len(), 3);

    Box::new(session).commit().await.unwrap();
}

/// Repeated matches across batches keep the larger score per column.
pub async fn duplicates_keep_max_score<B: Backend>(backend: &B) {
    let tenant = unique_tenant("dedupe");
    let prefix = unique("dd");
    let (x, y, z) = (item_id(&prefix, 0), item_id(&prefix, 1), item_id(&prefix, 2));

    let batches = vec![
        SearchResultBatch::new(6)
            .with_match(ItemMatch::item("m1", x.as_str(), tenant.clone(), 1.0))
            .with_match(ItemMatch::item("m2", y.as_str(), tenant.clone(), 4.0)),
        SearchResultBatch::new(6)
            .with_match(ItemMatch::attachment(
                "m3",
                x.as_str(),
                tenant.clone(),
                3.0,
                "att-1",
                "manual.pdf",
            ))
            .with_highlights("m3", ["torque <em>settings</em>"])
            .with_match(ItemMatch::item("m4", z.as_str(), tenant.clone(), 2.0)),
        SearchResultBatch::new(6)
            .with_match(ItemMatch::item("m5", x.as_str(), tenant.clone(), 5.0))
            .with_match(ItemMatch::item("m6", y.as_str(), tenant.clone(), 2.0)),
    ];

    let stager = SearchResultStager::new(StagingConfig::default().with_chunk_size(2));
    let mut session = backend.session().await.unwrap();
    let staged = stager.stage(&mut session, stream_of(batches)).await.unwrap();

    let rows = staged.table().read_all(&mut session).await.unwrap();
    assert_eq!(
        rows,
        vec![
            StagingRow::new(x.as_str(), Some(5.0), Some(3.0)),
            StagingRow::new(y.as_str(), Some(4.0), None),
            StagingRow::new(z.as_str(), Some(2.0), None),
        ]
    );

    let stats = staged.stats();
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.matches, 6);
    assert_eq!(stats.flushes, 3);
    assert_eq!(stats.flushed_rows, 6);
    assert_eq!(stats.total_estimate, 6);

    let context = staged.context_for(&ItemId::new(x.as_str())).unwrap();
    assert_eq!(context.highlights, vec!["torque <em>settings</em>"]);
    assert_eq!(context.attachments.len(), 1);
    assert_eq!(context.attachments[0].filename, "manual.pdf");

    Box::new(session).rollback().await.unwrap();
}

/// Identical inputs give identical pages, and consecutive pages tile the result.
pub async fn pagination_is_deterministic<B: Backend>(backend: &B) {
    let tenant = unique_tenant("paging");
    let prefix = unique("pg");
    // Groups of three items share a creation instant so ties reach the id.
    let items: Vec<CatalogItem> = catalog(&tenant, &prefix, 30)
        .into_iter()
        .enumerate()
        .map(|(n, mut item)| {
            item.created_at = base_time() + Duration::hours((n / 3) as i64);
            item.updated_at = item.created_at;
            item
        })
        .collect();
    seed(backend, items).await;

    let matches = matches_for(&tenant, (0..30).map(|n| item_id(&prefix, n)), |n| {
        (n % 3) as f64
    });
    let engine = ItemQueryEngine::new(QueryConfig::default().with_fetch_size(4));
    let spec = QuerySpec::new(tenant.clone());

    let mut session = backend.session().await.unwrap();
    let staged = SearchResultStager::new(StagingConfig::default())
        .stage(&mut session, stream_of(batches(matches, 7)))
        .await
        .unwrap();

    let mut pages = Vec::new();
    for _ in 0..2 {
        let rows = engine
            .query_items(&mut session, &spec, as_of(), 0, BatchSpec::new(5, 12), Some(&staged))
            .await
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        pages.push(ids(&rows));
    }
    assert_eq!(pages[0].len(), 12);
    assert_eq!(pages[0], pages[1]);

    let full = engine
        .query_items(&mut session, &spec, as_of(), 0, BatchSpec::new(0, 30), Some(&staged))
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(full.len(), 30);
    assert_eq!(ids(&full)[5..17], pages[0][..]);

    let scores: Vec<f64> = full
        .iter()
        .map(|r| r.context.as_ref().and_then(|c| c.score).unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{:?}", scores);

    let mut tiled = Vec::new();
    let mut batch = BatchSpec::first(10);
    for _ in 0..3 {
        let rows = engine
            .query_items(&mut session, &spec, as_of(), 0, batch, Some(&staged))
            .await
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        tiled.extend(ids(&rows));
        batch = batch.next_batch();
    }
    assert_eq!(tiled, ids(&full));

    Box::new(session).commit().await.unwrap();
}

/// Another tenant's items never come back, even when they are staged.
pub async fn tenant_isolation<B: Backend>(backend: &B) {
    let tenant_a = unique_tenant("tenant_a");
    let tenant_b = unique_tenant("tenant_b");
    let prefix_a = unique("ta");
    let prefix_b = unique("tb");
    let mut items = catalog(&tenant_a, &prefix_a, 5);
    items.extend(catalog(&tenant_b, &prefix_b, 5));
    seed(backend, items).await;

    let mut matches = matches_for(&tenant_a, (0..5).map(|n| item_id(&prefix_a, n)), |_| 1.0);
    matches.extend(matches_for(&tenant_b, (0..5).map(|n| item_id(&prefix_b, n)), |_| 9.0));
    // A result that claims tenant A for one of tenant B's items.
    matches.push(ItemMatch::item("forged", item_id(&prefix_b, 0), tenant_a.clone(), 10.0));

    let engine = ItemQueryEngine::default();
    let spec = QuerySpec::new(tenant_a.clone());
    let mut session = backend.session().await.unwrap();

    let staged = SearchResultStager::new(StagingConfig::default())
        .stage(&mut session, stream_of(batches(matches.clone(), 4)))
        .await
        .unwrap();
    assert_eq!(staged.item_count(), 10);

    let rows = engine
        .query_items(&mut session, &spec, as_of(), 0, BatchSpec::first(50), Some(&staged))
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.tenant_id == tenant_a));
    assert_eq!(
        engine
            .count_items(&mut session, &spec, as_of(), 0, Some(&staged))
            .await
            .unwrap(),
        5
    );

    let guarded = SearchResultStager::new(StagingConfig::default())
        .for_tenant(tenant_a.clone())
        .stage(&mut session, stream_of(batches(matches, 4)))
        .await
        .unwrap();
    assert_eq!(guarded.stats().foreign_tenant_matches, 5);
    assert_eq!(guarded.stats().matches, 6);

    Box::new(session).commit().await.unwrap();
}

/// 3000 matches in chunks of 500 against 200 items.
pub async fn scale_join<B: Backend>(backend: &B) {
    let tenant = unique_tenant("scale");
    let prefix = unique("sc");
    seed(backend, catalog(&tenant, &prefix, 200)).await;

    let matches: Vec<ItemMatch> = (0..3000)
        .map(|k| {
            let id = item_id(&prefix, k % 200);
            let score = (k % 97) as f64 / 10.0 + 0.1;
            if k % 7 == 0 {
                ItemMatch::attachment(
                    format!("m{}", k),
                    id,
                    tenant.clone(),
                    score,
                    format!("att-{}", k % 11),
                    "scan.pdf",
                )
            } else {
                ItemMatch::item(format!("m{}", k), id, tenant.clone(), score)
            }
        })
        .collect();
    let stager = SearchResultStager::new(StagingConfig::default().with_chunk_size(50));
    let engine = ItemQueryEngine::default();
    let spec = QuerySpec::new(tenant.clone());

    let mut session = backend.session().await.unwrap();
    let staged = stager
        .stage(&mut session, stream_of(batches(matches, 500)))
        .await
        .unwrap();
    assert_eq!(staged.stats().batches, 6);
    assert_eq!(staged.stats().matches, 3000);
    assert_eq!(staged.item_count(), 200);

    let rows = engine
        .query_items(&mut session, &spec, as_of(), 0, BatchSpec::new(0, 1000), Some(&staged))
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 200);
    for row in &rows {
        let context = row.context.as_ref().expect("staged rows carry context");
        assert!(context.score.is_some());
        assert!(!context.highlights.is_empty());
        assert!(context.highlights.len() <= 5);
    }
    assert_eq!(
        engine
            .count_items(&mut session, &spec, as_of(), 0, Some(&staged))
            .await
            .unwrap(),
        200
    );

    Box::new(session).commit().await.unwrap();
}

/// An empty stream stages an empty table that joins to nothing.
pub async fn empty_stream_joins_to_nothing<B: Backend>(backend: &B) {
    let tenant = unique_tenant("empty");
    let prefix = unique("em");
    seed(backend, catalog(&tenant, &prefix, 3)).await;

    let engine = ItemQueryEngine::default();
    let spec = QuerySpec::new(tenant.clone());
    let mut session = backend.session().await.unwrap();
    let staged = SearchResultStager::new(StagingConfig::default())
        .stage(&mut session, empty_stream())
        .await
        .unwrap();

    assert!(staged.table().is_indexed());
    assert_eq!(staged.stats().flushes, 0);
    assert!(staged.table().read_all(&mut session).await.unwrap().is_empty());

    let mut cursor = engine
        .query_items(&mut session, &spec, as_of(), 0, BatchSpec::default(), Some(&staged))
        .await
        .unwrap();
    assert!(cursor.next().await.unwrap().is_none());
    assert!(cursor.next().await.unwrap().is_none());
    drop(cursor);
    assert_eq!(
        engine
            .count_items(&mut session, &spec, as_of(), 0, Some(&staged))
            .await
            .unwrap(),
        0
    );

    Box::new(session).commit().await.unwrap();
}

/// Items are visible as of an instant and date ranges follow the caller's offset.
pub async fn visibility_and_date_range<B: Backend>(backend: &B) {
    let tenant = unique_tenant("visibility");
    let prefix = unique("vi");
    let id = |n: usize| item_id(&prefix, n);
    let at = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 3, d, h, 30, 0).unwrap();

    seed(
        backend,
        vec![
            CatalogItem::new(id(0), tenant.clone(), "live pump", base_time()),
            CatalogItem::new(id(1), tenant.clone(), "future", as_of() + Duration::days(1)),
            CatalogItem::new(id(2), tenant.clone(), "gone", base_time())
                .with_deleted_at(as_of() - Duration::days(1)),
            CatalogItem::new(id(3), tenant.clone(), "deleted later", base_time())
                .with_deleted_at(as_of() + Duration::days(1)),
            CatalogItem::new(id(4), tenant.clone(), "march first early", at(1, 0)),
            CatalogItem::new(id(5), tenant.clone(), "march first late", at(1, 23)),
            CatalogItem::new(id(6), tenant.clone(), "march second", at(2, 0)),
        ],
    )
    .await;

    let engine = ItemQueryEngine::default();
    let mut session = backend.session().await.unwrap();

    let spec = QuerySpec::new(tenant.clone());
    assert_eq!(
        visible_ids(&engine, &mut session, &spec, 0).await,
        vec![id(6), id(5), id(4), id(0), id(3)]
    );

    let march_first = DateRange::between(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    );
    let ranged = spec.clone().with_date_range(march_first);
    assert_eq!(visible_ids(&engine, &mut session, &ranged, 0).await, vec![id(5), id(4)]);
    assert_eq!(visible_ids(&engine, &mut session, &ranged, 60).await, vec![id(4)]);
    assert_eq!(visible_ids(&engine, &mut session, &ranged, -60).await, vec![id(6), id(5)]);

    let filtered = spec.with_filter(column(ItemColumn::Title).like("%pump%"));
    assert_eq!(visible_ids(&engine, &mut session, &filtered, 0).await, vec![id(0)]);

    Box::new(session).commit().await.unwrap();
}

/// A cursor dropped part way leaves the session usable.
pub async fn cursor_early_termination<B: Backend>(backend: &B) {
    let tenant = unique_tenant("cursor");
    let prefix = unique("cu");
    seed(backend, catalog(&tenant, &prefix, 12)).await;

    let engine = ItemQueryEngine::new(QueryConfig::default().with_fetch_size(2));
    let spec = QuerySpec::new(tenant.clone());
    let mut session = backend.session().await.unwrap();

    let taken: Vec<_> = engine
        .query_items(&mut session, &spec, as_of(), 0, BatchSpec::first(10), None)
        .await
        .unwrap()
        .into_stream()
        .take(3)
        .collect()
        .await;
    assert_eq!(taken.len(), 3);
    assert!(taken.iter().all(Result::is_ok));

    let mut cursor = engine
        .query_items(&mut session, &spec, as_of(), 0, BatchSpec::new(8, 10), None)
        .await
        .unwrap();
    let mut remaining = 0;
    while cursor.next().await.unwrap().is_some() {
        remaining += 1;
    }
    assert_eq!(remaining, 4);
    assert_eq!(cursor.info().returned, 4);
    assert!(!cursor.info().may_have_more());
    drop(cursor);

    assert_usable(&mut session).await;
    Box::new(session).commit().await.unwrap();
}

/// Stage and join through the pipeline, then browse without a search.
pub async fn pipeline_round_trip<B: Backend>(backend: &B) {
    let tenant = unique_tenant("pipeline");
    let prefix = unique("pi");
    seed(backend, catalog(&tenant, &prefix, 10)).await;

    let matches = matches_for(&tenant, [1, 4, 7, 8].map(|n| item_id(&prefix, n)), |n| {
        [2.0, 8.0, 5.0, 1.0][n]
    });
    let pipeline = SearchPipeline::new(&CatalogSearchConfig::default());
    let spec = QuerySpec::new(tenant.clone());

    let page = pipeline
        .run(backend, &spec, as_of(), 0, BatchSpec::first(3), stream_of(batches(matches, 2)))
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(
        ids(&page.rows),
        vec![item_id(&prefix, 4), item_id(&prefix, 7), item_id(&prefix, 1)]
    );
    assert_eq!(page.batch.returned, 3);
    assert!(page.batch.may_have_more());
    assert_eq!(page.staging.unwrap().matches, 4);

    let browsed = pipeline
        .browse(backend, &spec, as_of(), 0, BatchSpec::first(20))
        .await
        .unwrap();
    assert_eq!(browsed.total, 10);
    assert_eq!(browsed.rows.first().unwrap().id.as_str(), item_id(&prefix, 9));
    assert!(browsed.rows.iter().all(|r| r.context.is_none()));
    assert!(browsed.staging.is_none());
}

/// Name clashes and bad names are rejected before any SQL runs.
pub async fn table_name_rules<B: Backend>(backend: &B) {
    let manager = TemporaryTableManager::new();
    let name = unique("clash");
    let mut session = backend.session().await.unwrap();

    manager.create_table(&mut session, &name).await.unwrap();
    assert!(matches!(
        manager.create_table(&mut session, &name).await,
        Err(StorageError::Table(TableError::NameCollision { .. }))
    ));
    assert!(matches!(
        manager.create_table(&mut session, "items").await,
        Err(StorageError::Table(TableError::NameCollision { .. }))
    ));
    assert!(matches!(
        manager.create_table(&mut session, "bad name; --").await,
        Err(StorageError::Table(TableError::InvalidName { .. }))
    ));
    assert_usable(&mut session).await;
    Box::new(session).rollback().await.unwrap();

    // Rollback released the table, so the name is free again.
    let mut session = backend.session().await.unwrap();
    manager.create_table(&mut session, &name).await.unwrap();
    Box::new(session).rollback().await.unwrap();
}

/// A failing producer aborts staging with a source error.
pub async fn producer_failure_aborts<B: Backend>(backend: &B) {
    let tenant = unique_tenant("failing");
    let results = futures::stream::iter(vec![
        Ok(SearchResultBatch::new(2).with_match(ItemMatch::item("m1", "i1", tenant.clone(), 1.0))),
        Err(std::io::Error::other("search engine timed out")),
    ]);

    let mut session = backend.session().await.unwrap();
    let err = SearchResultStager::new(StagingConfig::default())
        .stage(&mut session, results)
        .await
        .unwrap_err();
    match err {
        StorageError::Staging(StagingError::Source { batches, message, .. }) => {
            assert_eq!(batches, 1);
            assert!(message.contains("timed out"));
        }
        other => panic!("unexpected error: {other}"),
    }
    Box::new(session).rollback().await.unwrap();
}

/// One call carrying the same id twice stores one row with the best scores.
pub async fn duplicate_ids_in_one_insert<B: Backend>(backend: &B) {
    let mut session = backend.session().await.unwrap();
    let mut table = TemporaryTableManager::new()
        .create_unique_table(&mut session, "dup_insert")
        .await
        .unwrap();

    let outcome = table
        .insert_all(
            &mut session,
            vec![
                StagingRow::new("x", Some(1.0), None),
                StagingRow::new("y", Some(4.0), None),
                StagingRow::new("x", Some(2.0), Some(0.5)),
            ],
        )
        .await
        .unwrap();
    if outcome.reliable {
        assert_eq!(outcome.reported, 2);
    }
    assert_eq!(
        table.read_all(&mut session).await.unwrap(),
        vec![
            StagingRow::new("x", Some(2.0), Some(0.5)),
            StagingRow::new("y", Some(4.0), None),
        ]
    );
    Box::new(session).rollback().await.unwrap();
}

/// A session whose `n`th INSERT fails, to exercise insert failures without
/// depending on a particular engine error.
struct FailingInserts<S> {
    inner: S,
    inserts: usize,
    fail_at: usize,
}

impl<S> FailingInserts<S> {
    fn new(inner: S, fail_at: usize) -> Self {
        Self {
            inner,
            inserts: 0,
            fail_at,
        }
    }
}

#[async_trait::async_trait]
impl<S: Session> Session for FailingInserts<S> {
    fn dialect(&self) -> &'static dyn Dialect {
        self.inner.dialect()
    }

    fn state(&self) -> &SessionState {
        self.inner.state()
    }

    fn state_mut(&mut self) -> &mut SessionState {
        self.inner.state_mut()
    }

    async fn execute(&mut self, sql: &RenderedSql) -> StorageResult<u64> {
        if sql.sql.starts_with("INSERT") {
            self.inserts += 1;
            if self.inserts == self.fail_at {
                return Err(StorageError::Backend(BackendError::QueryFailed {
                    backend_name: "test".to_string(),
                    message: "connection reset".to_string(),
                    source: None,
                }));
            }
        }
        self.inner.execute(sql).await
    }

    async fn query(&mut self, sql: &RenderedSql) -> StorageResult<Vec<SqlRow>> {
        self.inner.query(sql).await
    }

    async fn begin(&mut self) -> StorageResult<()> {
        self.inner.begin().await
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        Box::new(self.inner).commit().await
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        Box::new(self.inner).rollback().await
    }
}

/// An insert failure mid-stream aborts staging; rollback frees the table.
pub async fn insert_failure_aborts<B: Backend>(backend: &B) {
    let tenant = unique_tenant("insert_fail");
    let name = unique("insert_fail");
    let matches = matches_for(&tenant, (0..7).map(|n| format!("i{}", n)), |n| n as f64);
    let stager = SearchResultStager::new(StagingConfig::default().with_chunk_size(3));

    let mut session = FailingInserts::new(backend.session().await.unwrap(), 2);
    let err = stager
        .stage_named(&mut session, &name, stream_of(batches(matches, 2)))
        .await
        .unwrap_err();
    match err {
        StorageError::Staging(StagingError::InsertFailed {
            table,
            staged_rows,
            message,
            ..
        }) => {
            assert_eq!(table, name);
            assert_eq!(staged_rows, 3);
            assert!(message.contains("connection reset"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.inserts, 2);
    assert!(session.is_active());
    Box::new(session).rollback().await.unwrap();

    let mut session = backend.session().await.unwrap();
    assert!(!session.has_relation(&name));
    TemporaryTableManager::new()
        .create_table(&mut session, &name)
        .await
        .unwrap();
    Box::new(session).rollback().await.unwrap();
}

/// Runs every check.
///
/// Checks seed disjoint data, so running them in sequence against one
/// backend is equivalent to running them against fresh ones.
pub async fn run_all<B: Backend>(backend: &B) {
    staged_rows_round_trip(backend).await;
    create_index_twice(backend).await;
    duplicates_keep_max_score(backend).await;
    pagination_is_deterministic(backend).await;
    tenant_isolation(backend).await;
    scale_join(backend).await;
    empty_stream_joins_to_nothing(backend).await;
    visibility_and_date_range(backend).await;
    cursor_early_termination(backend).await;
    pipeline_round_trip(backend).await;
    table_name_rules(backend).await;
    producer_failure_aborts(backend).await;
    duplicate_ids_in_one_insert(backend).await;
    insert_failure_aborts(backend).await;
}
