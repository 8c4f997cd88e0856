//! Staging of search engine results into session-scoped temporary tables.
//!
//! The search engine returns ranked matches in chunks. Before they can be
//! joined against the catalog they are materialized into a temporary table
//! owned by the current [`Session`](crate::core::Session):
//!
//! 1. [`TemporaryTableManager::create_table`] creates and registers the table.
//! 2. [`SearchResultStager::stage`] drains the result stream, deduplicating
//!    matches per item in a [`FlushWindow`] and bulk inserting each window
//!    with a keep-the-larger-score upsert.
//! 3. The lookup index is built once, after the last batch.
//!
//! The resulting [`StagedResults`] is read-only. The table disappears when
//! the session ends, whichever way it ends.

pub mod batch;
mod stager;
mod table;
mod window;

/// Default prefix of generated staging table names.
pub const DEFAULT_STAGING_TABLE_PREFIX: &str = "staged_results";

/// Longest accepted staging table name.
///
/// Leaves room for the `idx_` prefix and `_id` suffix of the staging
/// index within every engine's identifier limit.
pub const MAX_TABLE_NAME_LEN: usize = 48;

pub use batch::{ItemMatch, MatchTarget, SearchResultBatch};
pub use stager::{ItemHighlights, SearchResultStager, StagedResults, StagingStats};
pub use table::{
    unique_table_name, InsertOutcome, StagedTable, StagingRow, StagingSchema,
    TemporaryTableManager,
};
pub use window::FlushWindow;

pub(crate) use table::ensure_index;
