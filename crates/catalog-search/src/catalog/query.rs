//! Query inputs and result rows of the join engine.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::sql::{Expr, SqlRow};
use crate::staging::StagedResults;
use crate::types::{AttachmentId, ItemId, TenantId};

/// An inclusive range of calendar days.
///
/// Days are interpreted in the caller's UTC offset, so the same range can
/// select different instants for callers in different time zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included, if bounded.
    pub from: Option<NaiveDate>,
    /// Last day included, if bounded.
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// A range bounded on both ends.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// A range starting on `from`.
    pub fn since(from: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    /// A range ending on `to`.
    pub fn until(to: NaiveDate) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    /// Converts the range into half-open UTC instants `[start, end)`.
    ///
    /// `start` is local midnight of `from`; `end` is local midnight of the
    /// day after `to`.
    pub fn to_utc_bounds(
        &self,
        utc_offset_minutes: i32,
    ) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let offset = Duration::minutes(i64::from(utc_offset_minutes));
        let local_midnight = |day: NaiveDate| day.and_time(NaiveTime::MIN).and_utc() - offset;

        let start = self.from.map(local_midnight);
        let end = self
            .to
            .and_then(|day| day.succ_opt())
            .map(local_midnight);
        (start, end)
    }
}

/// What to select from the catalog.
///
/// Every query is scoped to exactly one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// The tenant whose items are returned.
    pub tenant_id: TenantId,
    /// Optional creation-date window.
    pub date_range: Option<DateRange>,
    /// Optional extra predicate over catalog columns.
    pub filter: Option<Expr>,
}

impl QuerySpec {
    /// Selects every visible item of a tenant.
    pub fn new(tenant_id: impl Into<TenantId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            date_range: None,
            filter: None,
        }
    }

    /// Restricts the creation date.
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Adds a predicate over catalog columns.
    pub fn with_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// An attachment that matched the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedAttachment {
    /// The attachment.
    pub attachment_id: AttachmentId,
    /// Its file name.
    pub filename: String,
    /// Best score among its matches.
    pub score: f64,
}

/// Search context of a row that came from a staged search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchContext {
    /// Best score of any match on the item.
    pub score: Option<f64>,
    /// Best score among attachment matches.
    pub attachment_score: Option<f64>,
    /// Highlight snippets.
    pub highlights: Vec<String>,
    /// Attachments that matched.
    pub attachments: Vec<MatchedAttachment>,
}

/// One row of a catalog query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Item id.
    pub id: ItemId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display title.
    pub title: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
    /// Present only when a staged search was joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<MatchContext>,
}

impl ResultRow {
    /// Decodes a row projected by the join engine.
    ///
    /// Staged queries project the two score columns after the item columns.
    pub(crate) fn from_row(row: &SqlRow, staged: Option<&StagedResults>) -> StorageResult<Self> {
        let id = ItemId::new(row.get_text(0)?);
        let context = match staged {
            Some(staged) => {
                let gathered = staged.context_for(&id);
                Some(MatchContext {
                    score: row.get_opt_f64(5)?,
                    attachment_score: row.get_opt_f64(6)?,
                    highlights: gathered.map(|c| c.highlights.clone()).unwrap_or_default(),
                    attachments: gathered.map(|c| c.attachments.clone()).unwrap_or_default(),
                })
            }
            None => None,
        };

        Ok(Self {
            tenant_id: TenantId::new(row.get_text(1)?),
            title: row.get_text(2)?,
            created_at: row.get_timestamp(3)?,
            updated_at: row.get_timestamp(4)?,
            id,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_utc_bounds_without_offset() {
        let (start, end) = DateRange::between(day(2024, 3, 1), day(2024, 3, 31)).to_utc_bounds(0);
        assert_eq!(start, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
        assert_eq!(end, Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_utc_bounds_shift_with_offset() {
        // UTC+02:00: local midnight is 22:00 UTC the previous day.
        let (start, end) = DateRange::between(day(2024, 3, 1), day(2024, 3, 1)).to_utc_bounds(120);
        assert_eq!(start, Some(Utc.with_ymd_and_hms(2024, 2, 29, 22, 0, 0).unwrap()));
        assert_eq!(end, Some(Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap()));

        // UTC-05:00
        let (start, _) = DateRange::since(day(2024, 3, 1)).to_utc_bounds(-300);
        assert_eq!(start, Some(Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap()));
    }

    #[test]
    fn test_open_ranges() {
        assert_eq!(DateRange::default().to_utc_bounds(0), (None, None));
        let (start, end) = DateRange::until(day(2024, 1, 1)).to_utc_bounds(0);
        assert!(start.is_none());
        assert!(end.is_some());
    }
}
