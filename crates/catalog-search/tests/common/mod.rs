//! Test infrastructure for the catalog search layer.
//!
//! [`fixtures`] builds catalogs and search result streams; [`suite`] holds
//! backend-agnostic checks that every backend's test binary runs.

#![allow(dead_code)]

pub mod fixtures;
pub mod suite;

pub use fixtures::*;
