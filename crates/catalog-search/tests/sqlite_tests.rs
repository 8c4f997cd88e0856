//! SQLite backend integration tests.
//!
//! Every test gets its own in-memory database. The in-memory pool holds a
//! single connection, so a test must end one session before opening the next.

#![cfg(feature = "sqlite")]

mod common;

use catalog_search::backends::sqlite::SqliteBackend;
use catalog_search::catalog::{CatalogSchema, ItemQueryEngine, QuerySpec};
use catalog_search::config::{SqliteBackendConfig, StagingConfig};
use catalog_search::core::{Backend, BackendKind, Session};
use catalog_search::dialect::DialectKind;
use catalog_search::staging::{SearchResultStager, StagingRow, TemporaryTableManager};
use catalog_search::types::BatchSpec;

use common::*;

async fn create_backend() -> SqliteBackend {
    init_tracing();
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend
        .initialize()
        .await
        .expect("Failed to initialize schema");
    backend
}

// ============================================================================
// Shared suite
// ============================================================================

#[tokio::test]
async fn sqlite_staged_rows_round_trip() {
    common::suite::staged_rows_round_trip(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_create_index_twice() {
    common::suite::create_index_twice(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_duplicates_keep_max_score() {
    common::suite::duplicates_keep_max_score(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_pagination_is_deterministic() {
    common::suite::pagination_is_deterministic(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_tenant_isolation() {
    common::suite::tenant_isolation(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_scale_join() {
    common::suite::scale_join(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_empty_stream_joins_to_nothing() {
    common::suite::empty_stream_joins_to_nothing(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_visibility_and_date_range() {
    common::suite::visibility_and_date_range(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_cursor_early_termination() {
    common::suite::cursor_early_termination(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_pipeline_round_trip() {
    common::suite::pipeline_round_trip(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_table_name_rules() {
    common::suite::table_name_rules(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_producer_failure_aborts() {
    common::suite::producer_failure_aborts(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_duplicate_ids_in_one_insert() {
    common::suite::duplicate_ids_in_one_insert(&create_backend().await).await;
}

#[tokio::test]
async fn sqlite_insert_failure_aborts() {
    common::suite::insert_failure_aborts(&create_backend().await).await;
}

// ============================================================================
// SQLite specifics
// ============================================================================

#[tokio::test]
async fn test_backend_speaks_embedded_dialect() {
    let backend = create_backend().await;
    assert_eq!(backend.kind(), BackendKind::Sqlite);
    assert_eq!(backend.dialect().kind(), DialectKind::Embedded);

    let session = backend.session().await.unwrap();
    assert_eq!(session.dialect().kind(), DialectKind::Embedded);
    assert!(session.dialect().bulk_insert_reliable_row_count());
    Box::new(session).rollback().await.unwrap();
}

#[tokio::test]
async fn test_insert_larger_than_parameter_cap() {
    let backend = create_backend().await;
    let mut session = backend.session().await.unwrap();
    let mut table = TemporaryTableManager::new()
        .create_unique_table(&mut session, "wide")
        .await
        .unwrap();

    // 3 columns per row: 1000 rows need several statements under a 999 cap.
    let rows: Vec<StagingRow> = (0..1000)
        .map(|n| StagingRow::new(format!("id-{:05}", n), Some(n as f64), None))
        .collect();
    let outcome = table.insert_all(&mut session, rows).await.unwrap();
    assert_eq!(outcome.reported, 1000);
    assert_eq!(table.read_all(&mut session).await.unwrap().len(), 1000);

    Box::new(session).rollback().await.unwrap();
}

#[tokio::test]
async fn test_commit_drops_staging_table() {
    let backend = create_backend().await;
    let name = unique("committed");

    let mut session = backend.session().await.unwrap();
    TemporaryTableManager::new()
        .create_table(&mut session, &name)
        .await
        .unwrap();
    assert!(session.has_relation(&name));
    Box::new(session).commit().await.unwrap();

    let mut session = backend.session().await.unwrap();
    assert!(!session.has_relation(&name));
    TemporaryTableManager::new()
        .create_table(&mut session, &name)
        .await
        .unwrap();
    Box::new(session).rollback().await.unwrap();
}

#[tokio::test]
async fn test_dropped_session_rolls_back() {
    let backend = create_backend().await;
    let tenant = unique_tenant("dropped");
    let prefix = unique("dr");

    {
        let mut session = backend.session().await.unwrap();
        CatalogSchema::insert_items(&mut session, catalog(&tenant, &prefix, 4))
            .await
            .unwrap();
        // Dropped without commit.
    }

    let mut session = backend.session().await.unwrap();
    let count = ItemQueryEngine::default()
        .count_items(&mut session, &QuerySpec::new(tenant.clone()), as_of(), 0, None)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_usable(&mut session).await;
    Box::new(session).commit().await.unwrap();
}

#[tokio::test]
async fn test_staging_survives_implicit_flushes_in_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SqliteBackend::with_config(SqliteBackendConfig {
        path: Some(dir.path().join("catalog.db")),
        ..Default::default()
    })
    .unwrap();
    backend.initialize().await.unwrap();

    let tenant = unique_tenant("file");
    let prefix = unique("fi");
    seed(&backend, catalog(&tenant, &prefix, 20)).await;

    let matches = matches_for(&tenant, (0..20).map(|n| item_id(&prefix, n)), |n| n as f64);
    let mut session = backend.session().await.unwrap();
    let staged = SearchResultStager::new(StagingConfig::default().with_chunk_size(3))
        .stage(&mut session, stream_of(batches(matches, 4)))
        .await
        .unwrap();
    assert_eq!(staged.stats().flushes, 7);

    let rows = ItemQueryEngine::default()
        .query_items(
            &mut session,
            &QuerySpec::new(tenant.clone()),
            as_of(),
            0,
            BatchSpec::first(5),
            Some(&staged),
        )
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(rows[0].id.as_str(), item_id(&prefix, 19));
    assert_eq!(rows.len(), 5);
    Box::new(session).commit().await.unwrap();
}
