//! Output layer for lnd-stats.
//!
//! Renders the daily table into a CSV and two SVG charts, formats the
//! year-in-review text report and draws the fetch progress bar on stderr.

pub mod charts;
pub mod csv_export;
pub mod progress;
pub mod renderer;
pub mod report_view;

pub use renderer::{ensure_output_dir, render_all, RenderedFiles};
