//! Forwarding aggregation into one record per calendar day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use stats_core::calculations::{
    fee_rate_ppm, msat_to_sat, percentile, trailing_mean, MOVING_AVERAGE_DAYS,
};
use stats_core::error::{Result, StatsError};
use stats_core::models::{DailyRecord, DateRange, ForwardingEvent};
use stats_core::time_utils::ReportingTimezone;

// ── DayAccumulator ────────────────────────────────────────────────────────────

/// Running totals for a single day while events are being bucketed.
#[derive(Debug, Default)]
struct DayAccumulator {
    forwarded_msat: u64,
    fees_msat: u64,
    max_forward_msat: u64,
    max_fee_msat: u64,
    forward_sats: Vec<f64>,
}

impl DayAccumulator {
    fn add_event(&mut self, event: &ForwardingEvent) {
        self.forwarded_msat += event.amt_out_msat;
        self.fees_msat += event.fee_msat;
        self.max_forward_msat = self.max_forward_msat.max(event.amt_out_msat);
        self.max_fee_msat = self.max_fee_msat.max(event.fee_msat);
        self.forward_sats.push(msat_to_sat(event.amt_out_msat) as f64);
    }

    fn into_record(mut self, date: NaiveDate) -> DailyRecord {
        self.forward_sats.sort_by(|a, b| a.total_cmp(b));
        DailyRecord {
            date,
            tx_count: self.forward_sats.len() as u32,
            total_forwarded_msat: self.forwarded_msat,
            total_fees_msat: self.fees_msat,
            avg_ppm: fee_rate_ppm(self.fees_msat, self.forwarded_msat),
            moving_avg_5d_btc: 0.0,
            p50_forward_sat: percentile(&self.forward_sats, 50.0).round() as u64,
            p95_forward_sat: percentile(&self.forward_sats, 95.0).round() as u64,
            max_forward_msat: self.max_forward_msat,
            max_fee_msat: self.max_fee_msat,
        }
    }
}

// ── ForwardingAggregator ──────────────────────────────────────────────────────

/// Stateless helper that groups forwarding events by calendar day.
pub struct ForwardingAggregator;

impl ForwardingAggregator {
    /// Aggregate `events` over `range`, see [`Self::aggregate_daily`].
    pub fn aggregate_range(
        events: &[ForwardingEvent],
        range: &DateRange,
        tz: &ReportingTimezone,
    ) -> Result<Vec<DailyRecord>> {
        Self::aggregate_daily(events, range.start(), range.end(), tz)
    }

    /// Build one [`DailyRecord`] per day in `start..=end`, ascending.
    ///
    /// Events are bucketed by their calendar day in `tz`; days without
    /// events get zero totals. Events outside the range are ignored.
    pub fn aggregate_daily(
        events: &[ForwardingEvent],
        start: NaiveDate,
        end: NaiveDate,
        tz: &ReportingTimezone,
    ) -> Result<Vec<DailyRecord>> {
        if start > end {
            return Err(StatsError::EmptyRange { start, end });
        }

        // Pre-seed every day so that gaps come out as zero rows.
        let mut days: BTreeMap<NaiveDate, DayAccumulator> = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| (d, DayAccumulator::default()))
            .collect();

        let mut outside = 0usize;
        for event in events {
            match days.get_mut(&tz.local_date(event.timestamp)) {
                Some(day) => day.add_event(event),
                None => outside += 1,
            }
        }
        if outside > 0 {
            debug!("Ignored {} events outside {}..={}", outside, start, end);
        }

        let mut records: Vec<DailyRecord> = days
            .into_iter()
            .map(|(date, acc)| acc.into_record(date))
            .collect();

        let forwarded_btc: Vec<f64> = records.iter().map(|r| r.total_forwarded_btc()).collect();
        for (record, ma) in records
            .iter_mut()
            .zip(trailing_mean(&forwarded_btc, MOVING_AVERAGE_DAYS))
        {
            record.moving_avg_5d_btc = ma;
        }

        Ok(records)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use stats_core::calculations::MSAT_PER_BTC;

    fn event(ts_str: &str, forwarded_btc: f64, fee_btc: f64) -> ForwardingEvent {
        ForwardingEvent {
            timestamp: DateTime::parse_from_rfc3339(ts_str)
                .unwrap()
                .with_timezone(&Utc),
            amt_in_msat: 0,
            amt_out_msat: (forwarded_btc * MSAT_PER_BTC as f64).round() as u64,
            fee_msat: (fee_btc * MSAT_PER_BTC as f64).round() as u64,
            chan_id_in: 0,
            chan_id_out: 0,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc_range(start: &str, end: &str) -> DateRange {
        DateRange::parse(start, end).unwrap()
    }

    #[test]
    fn test_one_record_per_day_without_gaps() {
        let range = utc_range("2024-02-27", "2024-03-03");
        let events = vec![event("2024-02-29T12:00:00Z", 0.5, 0.0001)];
        let records =
            ForwardingAggregator::aggregate_range(&events, &range, &ReportingTimezone::utc())
                .unwrap();

        assert_eq!(records.len(), range.len());
        assert_eq!(records[0].date, date(2024, 2, 27));
        for pair in records.windows(2) {
            assert_eq!(pair[0].date.succ_opt().unwrap(), pair[1].date);
        }
        assert_eq!(records[2].tx_count, 1);
        assert_eq!(records[3].tx_count, 0);
    }

    #[test]
    fn test_weighted_ppm_scenario() {
        let range = utc_range("2024-01-01", "2024-01-02");
        let events = vec![
            event("2024-01-01T10:00:00Z", 1.0, 0.001),
            event("2024-01-02T10:00:00Z", 2.0, 0.004),
        ];
        let records =
            ForwardingAggregator::aggregate_range(&events, &range, &ReportingTimezone::utc())
                .unwrap();

        assert_eq!(records[0].avg_ppm, 1000);
        assert_eq!(records[1].avg_ppm, 2000);
    }

    #[test]
    fn test_day_ppm_is_from_totals_not_mean_of_events() {
        let range = utc_range("2024-01-01", "2024-01-01");
        // 1000 ppm on 1 BTC and 0 ppm on 3 BTC: weighted 250, mean-of-events 500.
        let events = vec![
            event("2024-01-01T01:00:00Z", 1.0, 0.001),
            event("2024-01-01T02:00:00Z", 3.0, 0.0),
        ];
        let records =
            ForwardingAggregator::aggregate_range(&events, &range, &ReportingTimezone::utc())
                .unwrap();
        assert_eq!(records[0].avg_ppm, 250);
    }

    #[test]
    fn test_empty_events_give_zero_days() {
        let range = utc_range("2024-06-01", "2024-06-03");
        let records =
            ForwardingAggregator::aggregate_range(&[], &range, &ReportingTimezone::utc()).unwrap();

        assert_eq!(records.len(), 3);
        for r in &records {
            assert_eq!(r.total_forwarded_msat, 0);
            assert_eq!(r.total_fees_msat, 0);
            assert_eq!(r.avg_ppm, 0);
            assert_eq!(r.moving_avg_5d_btc, 0.0);
            assert_eq!(r.p95_forward_sat, 0);
        }
    }

    #[test]
    fn test_moving_average_partial_then_full_window() {
        let range = utc_range("2024-01-01", "2024-01-06");
        let events: Vec<ForwardingEvent> = (1..=6)
            .map(|d| event(&format!("2024-01-0{}T12:00:00Z", d), d as f64, 0.0))
            .collect();
        let records =
            ForwardingAggregator::aggregate_range(&events, &range, &ReportingTimezone::utc())
                .unwrap();

        assert!((records[0].moving_avg_5d_btc - records[0].total_forwarded_btc()).abs() < 1e-12);
        assert!((records[1].moving_avg_5d_btc - 1.5).abs() < 1e-9);
        // Mean of days 0-4: (1+2+3+4+5)/5
        assert!((records[4].moving_avg_5d_btc - 3.0).abs() < 1e-9);
        // Window slides: (2+3+4+5+6)/5
        assert!((records[5].moving_avg_5d_btc - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_bucketing_follows_reporting_timezone() {
        let range = utc_range("2024-05-31", "2024-06-01");
        let events = vec![event("2024-06-01T02:30:00Z", 1.0, 0.0)];

        let utc = ForwardingAggregator::aggregate_range(&events, &range, &ReportingTimezone::utc())
            .unwrap();
        assert_eq!(utc[1].tx_count, 1);

        let ny = ReportingTimezone::resolve("America/New_York").unwrap();
        let local = ForwardingAggregator::aggregate_range(&events, &range, &ny).unwrap();
        assert_eq!(local[0].tx_count, 1);
        assert_eq!(local[1].tx_count, 0);
    }

    #[test]
    fn test_events_outside_range_are_ignored() {
        let range = utc_range("2024-01-02", "2024-01-02");
        let events = vec![
            event("2024-01-01T23:59:59Z", 9.0, 0.1),
            event("2024-01-02T00:00:00Z", 1.0, 0.0),
            event("2024-01-03T00:00:00Z", 9.0, 0.1),
        ];
        let records =
            ForwardingAggregator::aggregate_range(&events, &range, &ReportingTimezone::utc())
                .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_forwarded_msat, MSAT_PER_BTC);
    }

    #[test]
    fn test_percentiles_and_maxima() {
        let range = utc_range("2024-01-01", "2024-01-01");
        let events = vec![
            event("2024-01-01T01:00:00Z", 0.00001, 0.00000001),
            event("2024-01-01T02:00:00Z", 0.00002, 0.00000005),
            event("2024-01-01T03:00:00Z", 0.00003, 0.00000002),
            event("2024-01-01T04:00:00Z", 0.00004, 0.00000001),
        ];
        let records =
            ForwardingAggregator::aggregate_range(&events, &range, &ReportingTimezone::utc())
                .unwrap();
        let r = &records[0];

        assert_eq!(r.tx_count, 4);
        // sats: [1000, 2000, 3000, 4000]
        assert_eq!(r.p50_forward_sat, 2500);
        assert_eq!(r.p95_forward_sat, 3850);
        assert_eq!(r.max_forward_msat, 4_000_000);
        assert_eq!(r.max_fee_msat, 5_000);
    }

    #[test]
    fn test_start_after_end_is_empty_range() {
        let err = ForwardingAggregator::aggregate_daily(
            &[],
            date(2024, 1, 2),
            date(2024, 1, 1),
            &ReportingTimezone::utc(),
        )
        .unwrap_err();
        assert!(matches!(err, StatsError::EmptyRange { .. }));
    }
}
