//! Daily table export as CSV.

use std::path::Path;

use serde::Serialize;

use stats_core::calculations::msat_to_sat;
use stats_core::error::{Result, StatsError};
use stats_core::models::{DailyRecord, DATE_FORMAT};

/// File name of the daily CSV inside the output directory.
pub const DAILY_CSV_FILE: &str = "daily_forwarding.csv";

const CSV_HEADER: [&str; 11] = [
    "date",
    "tx_count",
    "total_forwarded_btc",
    "total_fees_btc",
    "total_fees_sat",
    "avg_ppm",
    "moving_avg_5d_btc",
    "p50_forward_sat",
    "p95_forward_sat",
    "max_forward_sat",
    "max_fee_sat",
];

/// One CSV line, in [`CSV_HEADER`] order. BTC amounts are pre-formatted to
/// 6 decimals.
#[derive(Debug, Serialize)]
struct DailyCsvRow {
    date: String,
    tx_count: u32,
    total_forwarded_btc: String,
    total_fees_btc: String,
    total_fees_sat: u64,
    avg_ppm: u64,
    moving_avg_5d_btc: String,
    p50_forward_sat: u64,
    p95_forward_sat: u64,
    max_forward_sat: u64,
    max_fee_sat: u64,
}

impl From<&DailyRecord> for DailyCsvRow {
    fn from(r: &DailyRecord) -> Self {
        Self {
            date: r.date.format(DATE_FORMAT).to_string(),
            tx_count: r.tx_count,
            total_forwarded_btc: format!("{:.6}", r.total_forwarded_btc()),
            total_fees_btc: format!("{:.6}", r.total_fees_btc()),
            total_fees_sat: r.total_fees_sat(),
            avg_ppm: r.avg_ppm,
            moving_avg_5d_btc: format!("{:.6}", r.moving_avg_5d_btc),
            p50_forward_sat: r.p50_forward_sat,
            p95_forward_sat: r.p95_forward_sat,
            max_forward_sat: msat_to_sat(r.max_forward_msat),
            max_fee_sat: msat_to_sat(r.max_fee_msat),
        }
    }
}

/// Write `daily` to `path`: a header row, then one row per day.
pub fn write_daily_csv(daily: &[DailyRecord], path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| StatsError::write(path, e))?;
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| StatsError::write(path, e))?;

    for record in daily {
        writer
            .serialize(DailyCsvRow::from(record))
            .map_err(|e| StatsError::write(path, e))?;
    }
    writer.flush().map_err(|e| StatsError::write(path, e))?;

    tracing::debug!("Wrote {} daily rows to {}", daily.len(), path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
