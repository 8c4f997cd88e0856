//! Stage-then-join in a single session.

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;

use crate::config::CatalogSearchConfig;
use crate::core::{Backend, Session};
use crate::error::StorageResult;
use crate::staging::{SearchResultBatch, SearchResultStager, StagingStats};
use crate::types::{BatchInfo, BatchSpec};

use super::engine::ItemQueryEngine;
use super::query::{QuerySpec, ResultRow};

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    /// Rows of the requested batch, most relevant first.
    pub rows: Vec<ResultRow>,
    /// Matching rows across all batches.
    pub total: u64,
    /// What was requested and returned.
    pub batch: BatchInfo,
    /// Staging counters, absent when no search was staged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging: Option<StagingStats>,
}

/// Runs staging and the catalog join in one session.
///
/// The session is committed when the page has been read and rolled back on
/// any failure, which also drops the staged table.
#[derive(Debug, Clone)]
pub struct SearchPipeline {
    stager: SearchResultStager,
    engine: ItemQueryEngine,
}

impl SearchPipeline {
    /// Creates a pipeline from the crate configuration.
    pub fn new(config: &CatalogSearchConfig) -> Self {
        Self {
            stager: SearchResultStager::new(config.staging.clone()),
            engine: ItemQueryEngine::new(config.query),
        }
    }

    /// Returns the join engine.
    pub fn engine(&self) -> &ItemQueryEngine {
        &self.engine
    }

    /// Stages a search result stream and returns one page of joined rows.
    pub async fn run<B, St, E>(
        &self,
        backend: &B,
        spec: &QuerySpec,
        as_of: DateTime<Utc>,
        utc_offset_minutes: i32,
        batch: BatchSpec,
        results: St,
    ) -> StorageResult<SearchPage>
    where
        B: Backend,
        St: Stream<Item = Result<SearchResultBatch, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut session = backend.session().await?;
        let outcome = self
            .search_in(&mut session, spec, as_of, utc_offset_minutes, batch, results)
            .await;
        finish(session, outcome).await
    }

    /// Returns one page of catalog rows without a search.
    pub async fn browse<B: Backend>(
        &self,
        backend: &B,
        spec: &QuerySpec,
        as_of: DateTime<Utc>,
        utc_offset_minutes: i32,
        batch: BatchSpec,
    ) -> StorageResult<SearchPage> {
        let mut session = backend.session().await?;
        let outcome = self
            .browse_in(&mut session, spec, as_of, utc_offset_minutes, batch)
            .await;
        finish(session, outcome).await
    }

    async fn search_in<S, St, E>(
        &self,
        session: &mut S,
        spec: &QuerySpec,
        as_of: DateTime<Utc>,
        utc_offset_minutes: i32,
        batch: BatchSpec,
        results: St,
    ) -> StorageResult<SearchPage>
    where
        S: Session + ?Sized,
        St: Stream<Item = Result<SearchResultBatch, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let staged = self
            .stager
            .clone()
            .for_tenant(spec.tenant_id.clone())
            .stage(session, results)
            .await?;

        let total = self
            .engine
            .count_items(session, spec, as_of, utc_offset_minutes, Some(&staged))
            .await?;
        let cursor = self
            .engine
            .query_items(session, spec, as_of, utc_offset_minutes, batch, Some(&staged))
            .await?;
        let requested = cursor.batch();
        let rows = cursor.collect_all().await?;

        Ok(SearchPage {
            batch: BatchInfo {
                requested,
                returned: rows.len() as u64,
            },
            rows,
            total,
            staging: Some(*staged.stats()),
        })
    }

    async fn browse_in<S: Session + ?Sized>(
        &self,
        session: &mut S,
        spec: &QuerySpec,
        as_of: DateTime<Utc>,
        utc_offset_minutes: i32,
        batch: BatchSpec,
    ) -> StorageResult<SearchPage> {
        let total = self
            .engine
            .count_items(session, spec, as_of, utc_offset_minutes, None)
            .await?;
        let cursor = self
            .engine
            .query_items(session, spec, as_of, utc_offset_minutes, batch, None)
            .await?;
        let requested = cursor.batch();
        let rows = cursor.collect_all().await?;

        Ok(SearchPage {
            batch: BatchInfo {
                requested,
                returned: rows.len() as u64,
            },
            rows,
            total,
            staging: None,
        })
    }
}

async fn finish<S: Session>(session: S, outcome: StorageResult<SearchPage>) -> StorageResult<SearchPage> {
    let session = Box::new(session);
    match outcome {
        Ok(page) => {
            session.commit().await?;
            Ok(page)
        }
        Err(e) => {
            if let Err(rollback) = session.rollback().await {
                tracing::warn!(error = %rollback, "Rollback after failed search also failed");
            }
            Err(e)
        }
    }
}
