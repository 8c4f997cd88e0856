//! The flush window: pending staging rows between two bulk inserts.

use std::collections::BTreeMap;

use crate::types::ItemId;

use super::table::StagingRow;

/// Pending staging rows, one per item id.
///
/// Pushing an id that is already pending keeps the larger score of each
/// column. Rows drain in id order so bulk inserts are deterministic.
#[derive(Debug, Default)]
pub struct FlushWindow {
    rows: BTreeMap<ItemId, (Option<f64>, Option<f64>)>,
}

impl FlushWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row, merging it with a pending row for the same id.
    pub fn push(&mut self, row: StagingRow) {
        let StagingRow {
            id,
            primary_score,
            secondary_score,
        } = row;
        let entry = self.rows.entry(id).or_insert((None, None));
        entry.0 = max_score(entry.0, primary_score);
        entry.1 = max_score(entry.1, secondary_score);
    }

    /// Returns the number of distinct pending ids.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Takes every pending row, leaving the window empty.
    pub fn drain(&mut self) -> Vec<StagingRow> {
        std::mem::take(&mut self.rows)
            .into_iter()
            .map(|(id, (primary_score, secondary_score))| StagingRow {
                id,
                primary_score,
                secondary_score,
            })
            .collect()
    }
}

/// The larger of two optional scores; a present score beats a missing one.
pub(crate) fn max_score(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
