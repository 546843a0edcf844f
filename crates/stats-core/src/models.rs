use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calculations::{msat_to_btc, msat_to_sat};
use crate::error::{Result, StatsError};

/// Date format accepted on the command line and used for daily keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single payment routed through the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingEvent {
    /// When the forward settled.
    pub timestamp: DateTime<Utc>,
    /// Amount received on the incoming channel, in millisatoshi.
    #[serde(default)]
    pub amt_in_msat: u64,
    /// Amount sent out on the outgoing channel (the forwarded amount).
    pub amt_out_msat: u64,
    /// Fee earned by the node, in millisatoshi.
    pub fee_msat: u64,
    #[serde(default)]
    pub chan_id_in: u64,
    #[serde(default)]
    pub chan_id_out: u64,
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// Inclusive range of calendar days, guaranteed `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end` with [`StatsError::InvalidRange`].
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(StatsError::InvalidRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings into a range.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both ends included.
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// A valid range always covers at least one day.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day of the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| StatsError::InvalidRange(format!("cannot parse date {:?}: {}", s, e)))
}

// ── DailyRecord ───────────────────────────────────────────────────────────────

/// Forwarding totals for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Number of forwarding events on this day.
    pub tx_count: u32,
    pub total_forwarded_msat: u64,
    pub total_fees_msat: u64,
    /// Fee rate recomputed from the day's totals.
    pub avg_ppm: u64,
    /// Trailing 5-day mean of forwarded BTC, partial for the first days.
    pub moving_avg_5d_btc: f64,
    /// Median single forward of the day, in sats.
    pub p50_forward_sat: u64,
    /// 95th percentile single forward of the day, in sats.
    pub p95_forward_sat: u64,
    pub max_forward_msat: u64,
    pub max_fee_msat: u64,
}

impl DailyRecord {
    /// A day without any forwards.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            tx_count: 0,
            total_forwarded_msat: 0,
            total_fees_msat: 0,
            avg_ppm: 0,
            moving_avg_5d_btc: 0.0,
            p50_forward_sat: 0,
            p95_forward_sat: 0,
            max_forward_msat: 0,
            max_fee_msat: 0,
        }
    }

    pub fn total_forwarded_btc(&self) -> f64 {
        msat_to_btc(self.total_forwarded_msat)
    }

    pub fn total_fees_btc(&self) -> f64 {
        msat_to_btc(self.total_fees_msat)
    }

    pub fn total_fees_sat(&self) -> u64 {
        msat_to_sat(self.total_fees_msat)
    }

    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

// ── Monthly ───────────────────────────────────────────────────────────────────

/// Calendar month key, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Forwarding totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRecord {
    pub month: YearMonth,
    pub tx_count: u64,
    pub total_forwarded_msat: u64,
    pub total_fees_msat: u64,
    /// Weighted fee rate: month fees over month volume, never a mean of days.
    pub avg_ppm: u64,
}

impl MonthlyRecord {
    pub fn total_forwarded_btc(&self) -> f64 {
        msat_to_btc(self.total_forwarded_msat)
    }

    pub fn total_fees_btc(&self) -> f64 {
        msat_to_btc(self.total_fees_msat)
    }
}

// ── Superlatives ──────────────────────────────────────────────────────────────

/// An extreme value together with the day it occurred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superlative {
    pub date: NaiveDate,
    pub value: u64,
}

/// Extreme-value statistics for a run.
///
/// Every superlative is `None` only for an empty daily table. Without any
/// forwards the event superlatives are zero on the first day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryStats {
    /// Largest daily forwarded total, msat.
    pub highest_forwarding_day: Option<Superlative>,
    /// Largest daily fee total, msat.
    pub highest_fees_day: Option<Superlative>,
    /// Largest daily fee rate, ppm.
    pub highest_avg_ppm_day: Option<Superlative>,
    /// Largest single forwarded amount, msat.
    pub largest_single_forward: Option<Superlative>,
    /// Largest single fee, msat.
    pub largest_single_fee: Option<Superlative>,
}
