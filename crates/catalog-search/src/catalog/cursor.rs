//! Pull-based iteration over one batch of catalog rows.

use std::collections::VecDeque;

use futures::Stream;

use crate::core::Session;
use crate::error::StorageResult;
use crate::sql::Select;
use crate::staging::StagedResults;
use crate::types::{BatchInfo, BatchSpec};

use super::query::ResultRow;

/// A cursor over the rows of one batch.
///
/// Rows are fetched from the session in pages of `fetch_size`, so a large
/// batch is never held in memory at once. The cursor borrows the session
/// for its whole lifetime; temporary tables it reads stay alive until it is
/// dropped.
pub struct ResultCursor<'s, S: Session + ?Sized> {
    session: &'s mut S,
    staged: Option<&'s StagedResults>,
    select: Select,
    batch: BatchSpec,
    next_offset: u64,
    fetch_size: u64,
    buffer: VecDeque<ResultRow>,
    returned: u64,
    exhausted: bool,
}

impl<'s, S: Session + ?Sized> ResultCursor<'s, S> {
    pub(crate) fn new(
        session: &'s mut S,
        select: Select,
        staged: Option<&'s StagedResults>,
        batch: BatchSpec,
        fetch_size: u64,
    ) -> Self {
        Self {
            session,
            staged,
            select,
            next_offset: batch.offset,
            fetch_size: fetch_size.max(1),
            buffer: VecDeque::new(),
            returned: 0,
            exhausted: batch.is_empty(),
            batch,
        }
    }

    /// Returns the batch this cursor serves, after clamping.
    pub fn batch(&self) -> BatchSpec {
        self.batch
    }

    /// Returns how many rows have been handed out so far.
    pub fn returned(&self) -> u64 {
        self.returned
    }

    /// Returns the batch summary for the rows handed out so far.
    pub fn info(&self) -> BatchInfo {
        BatchInfo {
            requested: self.batch,
            returned: self.returned,
        }
    }

    /// Returns the next row, or `None` once the batch is exhausted.
    pub async fn next(&mut self) -> StorageResult<Option<ResultRow>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill().await?;
        }
        let row = self.buffer.pop_front();
        if row.is_some() {
            self.returned += 1;
        }
        Ok(row)
    }

    async fn fill(&mut self) -> StorageResult<()> {
        let remaining = self.batch.end().saturating_sub(self.next_offset);
        let page = remaining.min(self.fetch_size);
        if page == 0 {
            self.exhausted = true;
            return Ok(());
        }

        let query = self.select.clone().offset(self.next_offset).limit(page);
        let rows = self.session.query_statement(&query.into()).await?;
        let fetched = rows.len() as u64;

        for row in &rows {
            self.buffer.push_back(ResultRow::from_row(row, self.staged)?);
        }
        self.next_offset += fetched;
        if fetched < page || self.next_offset >= self.batch.end() {
            self.exhausted = true;
        }

        tracing::trace!(
            offset = self.next_offset,
            fetched,
            exhausted = self.exhausted,
            "Fetched cursor page"
        );
        Ok(())
    }

    /// Drains the remaining rows into a vector.
    pub async fn collect_all(mut self) -> StorageResult<Vec<ResultRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Turns the cursor into a stream of rows.
    pub fn into_stream(self) -> impl Stream<Item = StorageResult<ResultRow>> + 's {
        futures::stream::try_unfold(self, |mut cursor| async move {
            match cursor.next().await {
                Ok(Some(row)) => Ok(Some((row, cursor))),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }
}

impl<S: Session + ?Sized> std::fmt::Debug for ResultCursor<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCursor")
            .field("batch", &self.batch)
            .field("next_offset", &self.next_offset)
            .field("buffered", &self.buffer.len())
            .field("returned", &self.returned)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
