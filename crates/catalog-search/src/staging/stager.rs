//! Staging of a search result stream into a temporary table.

use std::collections::HashMap;

use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::catalog::MatchedAttachment;
use crate::config::StagingConfig;
use crate::core::Session;
use crate::error::{StagingError, StorageError, StorageResult};
use crate::types::{ItemId, TenantId};

use super::batch::{ItemMatch, MatchTarget, SearchResultBatch};
use super::table::{StagedTable, StagingRow, TemporaryTableManager};
use super::window::FlushWindow;

/// Counters collected while staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StagingStats {
    /// Batches pulled from the stream.
    pub batches: u64,
    /// Matches staged, after the tenant guard.
    pub matches: u64,
    /// Bulk inserts issued.
    pub flushes: u64,
    /// Rows handed to bulk inserts, summed over every flush.
    pub flushed_rows: u64,
    /// Sum of driver-reported insert counts.
    pub reported_rows: u64,
    /// The engine's last total estimate.
    pub total_estimate: u64,
    /// Matches skipped because they belong to another tenant.
    pub foreign_tenant_matches: u64,
}

/// Highlights and attachments gathered for one item during staging.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ItemHighlights {
    /// Highlight snippets in match order, without duplicates.
    pub highlights: Vec<String>,
    /// Attachments that matched, in first-match order.
    pub attachments: Vec<MatchedAttachment>,
}

impl ItemHighlights {
    fn record(&mut self, item_match: &ItemMatch, snippets: &[String], config: &StagingConfig) {
        for snippet in snippets {
            if self.highlights.len() >= config.max_highlights_per_item {
                break;
            }
            if !self.highlights.contains(snippet) {
                self.highlights.push(snippet.clone());
            }
        }

        if let MatchTarget::Attachment {
            attachment_id,
            filename,
        } = &item_match.target
        {
            let attachment_count = self.attachments.len();
            match self
                .attachments
                .iter_mut()
                .find(|a| a.attachment_id == *attachment_id)
            {
                Some(existing) => existing.score = existing.score.max(item_match.score),
                None if attachment_count < config.max_attachments_per_item => {
                    self.attachments.push(MatchedAttachment {
                        attachment_id: attachment_id.clone(),
                        filename: filename.clone(),
                        score: item_match.score,
                    })
                }
                None => {}
            }
        }
    }
}

/// The outcome of staging: an indexed, read-only table plus match context.
///
/// The staged rows live in the database, but the match context is held in
/// memory: one [`ItemHighlights`] per distinct staged item, each bounded by
/// `max_highlights_per_item` and `max_attachments_per_item`. Memory therefore
/// grows with the number of distinct items, not with the number of matches.
#[derive(Debug)]
pub struct StagedResults {
    table: StagedTable,
    context: HashMap<ItemId, ItemHighlights>,
    stats: StagingStats,
}

impl StagedResults {
    /// Returns the staged table.
    pub fn table(&self) -> &StagedTable {
        &self.table
    }

    /// Returns the highlights gathered for an item.
    pub fn context_for(&self, id: &ItemId) -> Option<&ItemHighlights> {
        self.context.get(id)
    }

    /// Returns the number of distinct items staged.
    pub fn item_count(&self) -> usize {
        self.context.len()
    }

    /// Returns the staging counters.
    pub fn stats(&self) -> &StagingStats {
        &self.stats
    }
}

/// Turns a stream of search result batches into a staged table.
///
/// Each match becomes a staging row keyed by its item id. Rows accumulate in
/// a [`FlushWindow`] that is bulk inserted whenever it holds `chunk_size`
/// distinct ids and once more at the end, after which the lookup index is
/// built. A failure anywhere aborts staging and returns no table; the
/// session's rollback discards what was inserted.
#[derive(Debug, Clone)]
pub struct SearchResultStager {
    config: StagingConfig,
    tenant: Option<TenantId>,
    manager: TemporaryTableManager,
}

impl SearchResultStager {
    /// Creates a stager.
    pub fn new(config: StagingConfig) -> Self {
        Self {
            config,
            tenant: None,
            manager: TemporaryTableManager::new(),
        }
    }

    /// Skips matches that belong to any tenant other than `tenant`.
    pub fn for_tenant(mut self, tenant: TenantId) -> Self {
        self.tenant = Some(tenant);
        self
    }

    /// Returns the staging configuration.
    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// Stages the stream into a freshly named table.
    pub async fn stage<S, St, E>(&self, session: &mut S, stream: St) -> StorageResult<StagedResults>
    where
        S: Session + ?Sized,
        St: Stream<Item = Result<SearchResultBatch, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let table = self
            .manager
            .create_unique_table(session, &self.config.table_prefix)
            .await?;
        self.stage_into(session, table, stream).await
    }

    /// Stages the stream into a table created under `name`.
    pub async fn stage_named<S, St, E>(
        &self,
        session: &mut S,
        name: &str,
        stream: St,
    ) -> StorageResult<StagedResults>
    where
        S: Session + ?Sized,
        St: Stream<Item = Result<SearchResultBatch, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let table = self.manager.create_table(session, name).await?;
        self.stage_into(session, table, stream).await
    }

    async fn stage_into<S, St, E>(
        &self,
        session: &mut S,
        mut table: StagedTable,
        stream: St,
    ) -> StorageResult<StagedResults>
    where
        S: Session + ?Sized,
        St: Stream<Item = Result<SearchResultBatch, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut window = FlushWindow::new();
        let mut context: HashMap<ItemId, ItemHighlights> = HashMap::new();
        let mut stats = StagingStats::default();

        futures::pin_mut!(stream);
        while let Some(next) = stream.next().await {
            let batch = next.map_err(|e| {
                let source: Box<dyn std::error::Error + Send + Sync> = e.into();
                StorageError::Staging(StagingError::Source {
                    batches: stats.batches,
                    message: source.to_string(),
                    source: Some(source),
                })
            })?;
            stats.batches += 1;
            stats.total_estimate = batch.total_count;

            for item_match in &batch.matches {
                if !self.accepts(item_match) {
                    stats.foreign_tenant_matches += 1;
                    continue;
                }
                stats.matches += 1;

                context
                    .entry(item_match.item_id.clone())
                    .or_default()
                    .record(
                        item_match,
                        batch.highlights_for(&item_match.match_id),
                        &self.config,
                    );
                window.push(staging_row(item_match));

                if window.len() >= self.config.chunk_size {
                    flush(session, &mut table, &mut window, &mut stats).await?;
                }
            }
        }

        if !window.is_empty() {
            flush(session, &mut table, &mut window, &mut stats).await?;
        }

        table.create_index(session).await.map_err(|e| {
            StorageError::Staging(StagingError::IndexFailed {
                table: table.name().to_string(),
                message: e.to_string(),
            })
        })?;

        if stats.foreign_tenant_matches > 0 {
            tracing::warn!(
                table = %table.name(),
                skipped = stats.foreign_tenant_matches,
                "Skipped search matches belonging to another tenant"
            );
        }
        tracing::info!(
            table = %table.name(),
            batches = stats.batches,
            matches = stats.matches,
            items = context.len(),
            flushes = stats.flushes,
            "Staged search results"
        );

        Ok(StagedResults {
            table,
            context,
            stats,
        })
    }

    fn accepts(&self, item_match: &ItemMatch) -> bool {
        self.tenant
            .as_ref()
            .is_none_or(|tenant| *tenant == item_match.tenant_id)
    }
}

fn staging_row(item_match: &ItemMatch) -> StagingRow {
    let secondary = item_match.is_attachment().then_some(item_match.score);
    StagingRow::new(
        item_match.item_id.clone(),
        Some(item_match.score),
        secondary,
    )
}

async fn flush<S: Session + ?Sized>(
    session: &mut S,
    table: &mut StagedTable,
    window: &mut FlushWindow,
    stats: &mut StagingStats,
) -> StorageResult<()> {
    let rows = window.drain();
    let count = rows.len() as u64;
    let outcome = table.insert_all(session, rows).await.map_err(|e| {
        StorageError::Staging(StagingError::InsertFailed {
            table: table.name().to_string(),
            staged_rows: stats.flushed_rows,
            message: e.to_string(),
            source: Some(Box::new(e)),
        })
    })?;

    stats.flushes += 1;
    stats.flushed_rows += count;
    stats.reported_rows += outcome.reported;
    tracing::debug!(
        table = %table.name(),
        rows = count,
        reported = outcome.reported,
        reliable = outcome.reliable,
        "Flushed staging window"
    );
    Ok(())
}
