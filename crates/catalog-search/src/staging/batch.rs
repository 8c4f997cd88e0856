//! Search engine result batches.
//!
//! These are the values the full-text engine hands over, one chunk at a
//! time. They deserialize straight from the engine's JSON payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{AttachmentId, ItemId, MatchId, TenantId};

/// One chunk of search engine results.
///
/// # Examples
///
/// ```
/// use catalog_search::staging::{ItemMatch, SearchResultBatch};
///
/// let batch: SearchResultBatch = serde_json::from_str(r#"{
///     "total_count": 2,
///     "highlights": { "m-1": ["<em>pump</em> housing"] },
///     "matches": [
///         { "match_id": "m-1", "item_id": "item-1", "tenant_id": "acme", "score": 3.5 },
///         { "match_id": "m-2", "item_id": "item-1", "tenant_id": "acme", "score": 1.0,
///           "target": { "type": "attachment", "attachment_id": "a-9", "filename": "manual.pdf" } }
///     ]
/// }"#).unwrap();
///
/// assert_eq!(batch.matches.len(), 2);
/// assert!(batch.matches[1].is_attachment());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResultBatch {
    /// The engine's estimate of the total number of matches.
    #[serde(default)]
    pub total_count: u64,

    /// Highlight snippets per match, in the engine's order.
    #[serde(default)]
    pub highlights: HashMap<MatchId, Vec<String>>,

    /// The matches of this chunk, in rank order.
    #[serde(default)]
    pub matches: Vec<ItemMatch>,
}

impl SearchResultBatch {
    /// Creates an empty batch with the given total estimate.
    pub fn new(total_count: u64) -> Self {
        Self {
            total_count,
            ..Default::default()
        }
    }

    /// Appends a match.
    pub fn with_match(mut self, item_match: ItemMatch) -> Self {
        self.matches.push(item_match);
        self
    }

    /// Sets the highlight snippets of a match.
    pub fn with_highlights<I, S>(mut self, match_id: impl Into<MatchId>, snippets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.highlights.insert(
            match_id.into(),
            snippets.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Returns the snippets of a match, if any.
    pub fn highlights_for(&self, match_id: &MatchId) -> &[String] {
        self.highlights
            .get(match_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns true if the batch carries no matches.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// What a match hit: the item itself or one of its attachments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchTarget {
    /// The item's own fields.
    #[default]
    Item,
    /// An attachment owned by the item.
    Attachment {
        /// The matched attachment.
        attachment_id: AttachmentId,
        /// The attachment's file name, for display.
        filename: String,
    },
}

/// A single search engine match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMatch {
    /// Engine-side id of this match; keys the batch highlights.
    pub match_id: MatchId,
    /// The catalog item the match belongs to. Attachment matches carry the
    /// owning item's id.
    pub item_id: ItemId,
    /// The tenant owning the item.
    pub tenant_id: TenantId,
    /// Relevance score; larger is better.
    pub score: f64,
    /// What the match hit.
    #[serde(default)]
    pub target: MatchTarget,
}

impl ItemMatch {
    /// Creates a match on the item itself.
    pub fn item(
        match_id: impl Into<MatchId>,
        item_id: impl Into<ItemId>,
        tenant_id: impl Into<TenantId>,
        score: f64,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            item_id: item_id.into(),
            tenant_id: tenant_id.into(),
            score,
            target: MatchTarget::Item,
        }
    }

    /// Creates a match on one of the item's attachments.
    pub fn attachment(
        match_id: impl Into<MatchId>,
        item_id: impl Into<ItemId>,
        tenant_id: impl Into<TenantId>,
        score: f64,
        attachment_id: impl Into<AttachmentId>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            item_id: item_id.into(),
            tenant_id: tenant_id.into(),
            score,
            target: MatchTarget::Attachment {
                attachment_id: attachment_id.into(),
                filename: filename.into(),
            },
        }
    }

    /// Returns true if the match hit an attachment.
    pub fn is_attachment(&self) -> bool {
        matches!(self.target, MatchTarget::Attachment { .. })
    }
}
