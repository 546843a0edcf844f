//! Data layer for lnd-stats.
//!
//! Pulls forwarding history out of an LND node through `lncli`, buckets it
//! into one record per calendar day and derives the monthly rollups and
//! superlatives shown in the year-in-review report.

pub mod aggregator;
pub mod fetcher;
pub mod reporter;
