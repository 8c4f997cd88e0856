//! Pagination types for catalog queries.
//!
//! Catalog queries are paginated with an offset and a limit. Because the join
//! engine always orders with the item id as the final tie-break, the same
//! [`BatchSpec`] over the same inputs returns the same rows on every call.

use serde::{Deserialize, Serialize};

/// Default number of rows per batch.
pub const DEFAULT_BATCH_LIMIT: u64 = 20;

/// An offset + limit pagination request.
///
/// # Examples
///
/// ```
/// use catalog_search::types::BatchSpec;
///
/// let first = BatchSpec::new(0, 25);
/// let second = first.next_batch();
/// assert_eq!(second.offset, 25);
/// assert_eq!(second.limit, 25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSpec {
    /// Number of rows to skip.
    #[serde(default)]
    pub offset: u64,

    /// Maximum number of rows to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    DEFAULT_BATCH_LIMIT
}

impl Default for BatchSpec {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl BatchSpec {
    /// Creates a batch with the given offset and limit.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Creates the first batch with the given limit.
    pub fn first(limit: u64) -> Self {
        Self { offset: 0, limit }
    }

    /// Returns the batch immediately following this one.
    pub fn next_batch(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }

    /// Returns a copy with the limit clamped to `max`.
    pub fn clamped(&self, max: u64) -> Self {
        Self {
            offset: self.offset,
            limit: self.limit.min(max),
        }
    }

    /// Returns true if this batch can never yield a row.
    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }

    /// Returns the exclusive end position of this batch.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }
}

/// Summary information about a fetched batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchInfo {
    /// The batch that was requested.
    pub requested: BatchSpec,

    /// Number of rows actually returned.
    pub returned: u64,
}

impl BatchInfo {
    /// Returns true if a following batch might contain more rows.
    pub fn may_have_more(&self) -> bool {
        self.returned == self.requested.limit && self.requested.limit > 0
    }
}
