//! Core value types shared across the crate.
//!
//! - [`TenantId`], [`ItemId`], [`MatchId`], [`AttachmentId`] - opaque identifiers
//! - [`BatchSpec`] - offset + limit pagination

mod ids;
mod pagination;

pub use ids::{AttachmentId, ItemId, MatchId, TenantId};
pub use pagination::{BatchInfo, BatchSpec, DEFAULT_BATCH_LIMIT};
