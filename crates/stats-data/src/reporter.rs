//! Monthly rollups and superlatives derived from the daily table.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use stats_core::calculations::{fee_rate_ppm, msat_to_btc};
use stats_core::models::{
    DailyRecord, ForwardingEvent, MonthlyRecord, Superlative, SummaryStats, YearMonth,
};
use stats_core::time_utils::ReportingTimezone;

/// Everything the year-in-review report shows.
#[derive(Debug, Clone, PartialEq)]
pub struct YearReview {
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub monthly: Vec<MonthlyRecord>,
    pub summary: SummaryStats,
    pub total_tx_count: u64,
    pub total_forwarded_msat: u64,
    pub total_fees_msat: u64,
    /// Fee rate over the whole run, from the grand totals.
    pub overall_ppm: u64,
    /// Mean forwarded BTC over the months present.
    pub avg_forwarded_per_month_btc: f64,
}

impl YearReview {
    pub fn total_forwarded_btc(&self) -> f64 {
        msat_to_btc(self.total_forwarded_msat)
    }

    pub fn total_fees_btc(&self) -> f64 {
        msat_to_btc(self.total_fees_msat)
    }
}

/// Sum the daily table into one record per calendar month, ascending.
///
/// The fee rate is recomputed from each month's totals.
pub fn monthly_rollup(daily: &[DailyRecord]) -> Vec<MonthlyRecord> {
    let mut months: BTreeMap<YearMonth, (u64, u64, u64)> = BTreeMap::new();
    for day in daily {
        let totals = months.entry(day.month()).or_default();
        totals.0 += day.tx_count as u64;
        totals.1 += day.total_forwarded_msat;
        totals.2 += day.total_fees_msat;
    }

    months
        .into_iter()
        .map(|(month, (tx_count, forwarded, fees))| MonthlyRecord {
            month,
            tx_count,
            total_forwarded_msat: forwarded,
            total_fees_msat: fees,
            avg_ppm: fee_rate_ppm(fees, forwarded),
        })
        .collect()
}

/// Scan for superlatives; ties go to the earliest date.
///
/// Day superlatives come from `daily`. Single-event superlatives come from
/// the events whose local day falls inside the daily table. Every field is
/// `None` only when `daily` is empty.
pub fn summarize(
    daily: &[DailyRecord],
    events: &[ForwardingEvent],
    tz: &ReportingTimezone,
) -> SummaryStats {
    let in_table = |date: NaiveDate| match (daily.first(), daily.last()) {
        (Some(first), Some(last)) => first.date <= date && date <= last.date,
        _ => false,
    };

    let dated_events: Vec<(NaiveDate, &ForwardingEvent)> = events
        .iter()
        .map(|e| (tz.local_date(e.timestamp), e))
        .filter(|(date, _)| in_table(*date))
        .collect();

    // Without events the single-event superlatives read zero on the first
    // day, like the day superlatives of an all-zero table.
    let zero_on_first_day = || daily.first().map(|d| Superlative { date: d.date, value: 0 });

    SummaryStats {
        highest_forwarding_day: first_max(daily.iter().map(|d| (d.date, d.total_forwarded_msat))),
        highest_fees_day: first_max(daily.iter().map(|d| (d.date, d.total_fees_msat))),
        highest_avg_ppm_day: first_max(daily.iter().map(|d| (d.date, d.avg_ppm))),
        largest_single_forward: first_max(
            dated_events.iter().map(|(date, e)| (*date, e.amt_out_msat)),
        )
        .or_else(zero_on_first_day),
        largest_single_fee: first_max(dated_events.iter().map(|(date, e)| (*date, e.fee_msat)))
            .or_else(zero_on_first_day),
    }
}

/// Build the complete review from the daily table and raw events.
pub fn build_review(
    daily: &[DailyRecord],
    events: &[ForwardingEvent],
    tz: &ReportingTimezone,
) -> YearReview {
    let monthly = monthly_rollup(daily);
    let total_tx_count = monthly.iter().map(|m| m.tx_count).sum();
    let total_forwarded_msat: u64 = monthly.iter().map(|m| m.total_forwarded_msat).sum();
    let total_fees_msat: u64 = monthly.iter().map(|m| m.total_fees_msat).sum();
    let avg_forwarded_per_month_btc = if monthly.is_empty() {
        0.0
    } else {
        msat_to_btc(total_forwarded_msat) / monthly.len() as f64
    };

    YearReview {
        first_day: daily.first().map(|d| d.date),
        last_day: daily.last().map(|d| d.date),
        summary: summarize(daily, events, tz),
        monthly,
        total_tx_count,
        total_forwarded_msat,
        total_fees_msat,
        overall_ppm: fee_rate_ppm(total_fees_msat, total_forwarded_msat),
        avg_forwarded_per_month_btc,
    }
}

/// First `(date, value)` pair holding the maximum value.
fn first_max(items: impl Iterator<Item = (NaiveDate, u64)>) -> Option<Superlative> {
    let mut best: Option<Superlative> = None;
    for (date, value) in items {
        match best {
            Some(b) if value < b.value => {}
            Some(b) if value == b.value && date >= b.date => {}
            _ => best = Some(Superlative { date, value }),
        }
    }
    best
}

// ── Tests ─────────────────────────────────────────────────────────────────────
