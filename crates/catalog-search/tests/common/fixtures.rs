//! Catalog and search result fixtures.
//!
//! Backends that share one database across tests (the container-backed
//! ones) need disjoint data per test, so every fixture is keyed by a
//! uuid-derived prefix.

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::Stream;

use catalog_search::catalog::{CatalogItem, CatalogSchema};
use catalog_search::core::{Backend, Session};
use catalog_search::staging::{ItemMatch, SearchResultBatch};
use catalog_search::types::TenantId;

/// Returns `name` with a unique suffix.
pub fn unique(name: &str) -> String {
    format!("{}_{}", name, uuid::Uuid::new_v4().simple())
}

/// Returns a tenant id unique to the calling test.
pub fn unique_tenant(name: &str) -> TenantId {
    TenantId::new(unique(name))
}

/// The instant the first fixture item is created.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// The instant catalog queries are evaluated at.
pub fn as_of() -> DateTime<Utc> {
    base_time() + Duration::days(365)
}

/// Returns the id of the `n`th item of a fixture.
pub fn item_id(prefix: &str, n: usize) -> String {
    format!("{}-{:04}", prefix, n)
}

/// A catalog of `count` live items created one hour apart, oldest first.
pub fn catalog(tenant: &TenantId, prefix: &str, count: usize) -> Vec<CatalogItem> {
    (0..count)
        .map(|n| {
            CatalogItem::new(
                item_id(prefix, n),
                tenant.clone(),
                format!("Item {} of {}", n, prefix),
                base_time() + Duration::hours(n as i64),
            )
        })
        .collect()
}

/// Seeds items in their own committed session.
pub async fn seed<B: Backend>(backend: &B, items: Vec<CatalogItem>) {
    let mut session = backend.session().await.expect("Failed to open session");
    CatalogSchema::insert_items(&mut session, items)
        .await
        .expect("Failed to seed catalog");
    Box::new(session).commit().await.expect("Failed to commit seed");
}

/// Groups matches into batches of `per_batch`, giving every match one
/// highlight snippet.
pub fn batches(matches: Vec<ItemMatch>, per_batch: usize) -> Vec<SearchResultBatch> {
    let total = matches.len() as u64;
    matches
        .chunks(per_batch.max(1))
        .map(|chunk| {
            chunk.iter().fold(SearchResultBatch::new(total), |batch, m| {
                let snippet = format!("<em>{}</em>", m.match_id);
                batch
                    .with_highlights(m.match_id.clone(), [snippet])
                    .with_match(m.clone())
            })
        })
        .collect()
}

/// Turns batches into the stream a search engine client would hand over.
pub fn stream_of(
    batches: Vec<SearchResultBatch>,
) -> impl Stream<Item = Result<SearchResultBatch, std::io::Error>> {
    futures::stream::iter(batches.into_iter().map(Ok))
}

/// An empty result stream.
pub fn empty_stream() -> impl Stream<Item = Result<SearchResultBatch, std::io::Error>> {
    stream_of(Vec::new())
}

/// One item-level match per item id, scored by the given function.
pub fn matches_for(
    tenant: &TenantId,
    ids: impl IntoIterator<Item = String>,
    score: impl Fn(usize) -> f64,
) -> Vec<ItemMatch> {
    ids.into_iter()
        .enumerate()
        .map(|(n, id)| ItemMatch::item(unique("m"), id, tenant.clone(), score(n)))
        .collect()
}

/// Checks a session is still usable by running a trivial query.
pub async fn assert_usable<S: Session + ?Sized>(session: &mut S) {
    let select_one = catalog_search::sql::RenderedSql::raw("SELECT 1");
    session
        .query(&select_one)
        .await
        .expect("Session should still accept queries");
}

/// Installs a test log subscriber controlled by `RUST_LOG`. Safe to call
/// from every test.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_test_writer())
        .try_init();
}
