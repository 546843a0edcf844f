//! Core types for lnd-stats.
//!
//! Holds the error taxonomy, the forwarding domain models, unit conversion
//! and fee-rate arithmetic, text formatting helpers, reporting-timezone
//! handling and the command-line settings shared by the other crates.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{Result, StatsError};
