//! Writes every output file of a run into the output directory.

use std::path::{Path, PathBuf};

use stats_core::error::{Result, StatsError};
use stats_core::models::DailyRecord;

use crate::charts::{
    render_fees_chart, render_forwarded_chart, FEES_CHART_FILE, FORWARDED_CHART_FILE,
};
use crate::csv_export::{write_daily_csv, DAILY_CSV_FILE};

/// Paths of the files produced by [`render_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFiles {
    pub csv: PathBuf,
    pub forwarded_chart: PathBuf,
    pub fees_chart: PathBuf,
}

impl RenderedFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            csv: dir.join(DAILY_CSV_FILE),
            forwarded_chart: dir.join(FORWARDED_CHART_FILE),
            fees_chart: dir.join(FEES_CHART_FILE),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.csv, &self.forwarded_chart, &self.fees_chart]
            .into_iter()
            .map(PathBuf::as_path)
    }
}

/// Create `dir` and any missing parents.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| StatsError::write(dir, e))
}

/// Write the CSV and both charts into `dir`, creating it if needed.
pub fn render_all(daily: &[DailyRecord], dir: &Path) -> Result<RenderedFiles> {
    ensure_output_dir(dir)?;
    let files = RenderedFiles::in_dir(dir);

    write_daily_csv(daily, &files.csv)?;
    render_forwarded_chart(daily, &files.forwarded_chart)?;
    render_fees_chart(daily, &files.fees_chart)?;

    Ok(files)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
