//! Fetch, aggregate, render and summarise, in that order.

use std::path::PathBuf;

use tracing::info;

use stats_core::error::Result;
use stats_core::models::DateRange;
use stats_core::settings::Settings;
use stats_core::time_utils::ReportingTimezone;
use stats_data::aggregator::ForwardingAggregator;
use stats_data::fetcher::{fetch_range, ForwardingSource, ProgressSink};
use stats_data::reporter::{build_review, YearReview};
use stats_output::{render_all, RenderedFiles};

/// Validated inputs of a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub range: DateRange,
    pub timezone: ReportingTimezone,
    pub output_dir: PathBuf,
}

impl RunConfig {
    /// Validate the date range and timezone from the command line.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            range: settings.date_range()?,
            timezone: settings.reporting_timezone()?,
            output_dir: settings.output_dir.clone(),
        })
    }
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub review: YearReview,
    pub files: RenderedFiles,
    pub event_count: usize,
}

/// Validate `settings`, then run the pipeline. Nothing is fetched when the
/// settings are invalid.
pub fn execute<S, P>(settings: &Settings, source: &mut S, progress: &mut P) -> Result<RunOutcome>
where
    S: ForwardingSource + ?Sized,
    P: ProgressSink + ?Sized,
{
    let config = RunConfig::from_settings(settings)?;
    run(&config, source, progress)
}

pub fn run<S, P>(config: &RunConfig, source: &mut S, progress: &mut P) -> Result<RunOutcome>
where
    S: ForwardingSource + ?Sized,
    P: ProgressSink + ?Sized,
{
    let events = fetch_range(source, &config.range, &config.timezone, progress)?;
    let daily = ForwardingAggregator::aggregate_range(&events, &config.range, &config.timezone)?;

    info!("Writing output to {}", config.output_dir.display());
    let files = render_all(&daily, &config.output_dir)?;
    let review = build_review(&daily, &events, &config.timezone);

    Ok(RunOutcome {
        review,
        files,
        event_count: events.len(),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use clap::Parser;
    use stats_core::calculations::MSAT_PER_BTC;
    use stats_core::error::StatsError;
    use stats_core::models::ForwardingEvent;
    use stats_core::time_utils::DayWindow;
    use stats_data::fetcher::NoProgress;
    use tempfile::TempDir;

    /// Replays fixed events and counts how often it was asked.
    struct FakeSource {
        events: Vec<ForwardingEvent>,
        calls: usize,
    }

    impl FakeSource {
        fn new(events: Vec<ForwardingEvent>) -> Self {
            Self { events, calls: 0 }
        }
    }

    impl ForwardingSource for FakeSource {
        fn fetch_window(&mut self, window: &DayWindow) -> Result<Vec<ForwardingEvent>> {
            self.calls += 1;
            Ok(self
                .events
                .iter()
                .filter(|e| e.timestamp >= window.start && e.timestamp < window.end)
                .cloned()
                .collect())
        }
    }

    fn settings(args: &[&str]) -> Settings {
        Settings::parse_from(std::iter::once("lnd-stats").chain(args.iter().copied()))
    }

    fn noon_event(range: &DateRange, day: i64, forwarded_msat: u64, fee_msat: u64) -> ForwardingEvent {
        let window = ReportingTimezone::utc().day_window(range.start() + Duration::days(day));
        ForwardingEvent {
            timestamp: window.start + Duration::hours(12),
            amt_in_msat: forwarded_msat + fee_msat,
            amt_out_msat: forwarded_msat,
            fee_msat,
            chan_id_in: 7,
            chan_id_out: 9,
        }
    }

    #[test]
    fn test_start_after_end_fails_before_any_fetch() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let s = settings(&[
            "--start",
            "2024-02-01",
            "--end",
            "2024-01-01",
            "--output-dir",
            out.to_str().unwrap(),
        ]);
        let mut source = FakeSource::new(Vec::new());

        let err = execute(&s, &mut source, &mut NoProgress).unwrap_err();

        assert!(matches!(err, StatsError::InvalidRange(_)));
        assert_eq!(source.calls, 0);
        assert!(!out.exists(), "nothing may be written for an invalid range");
    }

    #[test]
    fn test_unknown_timezone_fails_before_any_fetch() {
        let s = settings(&[
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-02",
            "--timezone",
            "Nowhere/Special",
        ]);
        let mut source = FakeSource::new(Vec::new());

        let err = execute(&s, &mut source, &mut NoProgress).unwrap_err();

        assert!(matches!(err, StatsError::Config(_)));
        assert_eq!(source.calls, 0);
    }

    #[test]
    fn test_full_run_writes_files_and_review() {
        let tmp = TempDir::new().unwrap();
        let range = DateRange::parse("2024-01-01", "2024-01-02").unwrap();
        let events = vec![
            noon_event(&range, 0, MSAT_PER_BTC, MSAT_PER_BTC / 1000),
            noon_event(&range, 1, 2 * MSAT_PER_BTC, 4 * MSAT_PER_BTC / 1000),
        ];
        let config = RunConfig {
            range,
            timezone: ReportingTimezone::utc(),
            output_dir: tmp.path().join("lnd_stats"),
        };
        let mut source = FakeSource::new(events);

        let outcome = run(&config, &mut source, &mut NoProgress).unwrap();

        assert_eq!(source.calls, 2);
        assert_eq!(outcome.event_count, 2);
        assert_eq!(outcome.review.monthly.len(), 1);
        assert_eq!(outcome.review.monthly[0].avg_ppm, 1667);
        for path in outcome.files.iter() {
            assert!(path.is_file(), "{} missing", path.display());
        }

        let csv = std::fs::read_to_string(&outcome.files.csv).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.lines().nth(1).unwrap().starts_with("2024-01-01,1,1.000000,0.001000,"));
    }

    #[test]
    fn test_run_without_forwards_still_reports() {
        let tmp = TempDir::new().unwrap();
        let config = RunConfig {
            range: DateRange::parse("2024-06-01", "2024-06-03").unwrap(),
            timezone: ReportingTimezone::utc(),
            output_dir: tmp.path().to_path_buf(),
        };
        let mut source = FakeSource::new(Vec::new());

        let outcome = run(&config, &mut source, &mut NoProgress).unwrap();

        assert_eq!(source.calls, 3);
        assert_eq!(outcome.review.total_forwarded_msat, 0);
        assert_eq!(outcome.review.overall_ppm, 0);
        let largest = outcome.review.summary.largest_single_forward.unwrap();
        assert_eq!(largest.value, 0);
        assert_eq!(largest.date, config.range.start());
    }

    #[test]
    fn test_source_failure_aborts_run() {
        struct Down;
        impl ForwardingSource for Down {
            fn fetch_window(&mut self, window: &DayWindow) -> Result<Vec<ForwardingEvent>> {
                Err(StatsError::SourceUnavailable {
                    window: window.to_string(),
                    reason: "connection refused".to_string(),
                })
            }
        }

        let tmp = TempDir::new().unwrap();
        let config = RunConfig {
            range: DateRange::parse("2024-06-01", "2024-06-03").unwrap(),
            timezone: ReportingTimezone::utc(),
            output_dir: tmp.path().join("out"),
        };

        let err = run(&config, &mut Down, &mut NoProgress).unwrap_err();
        assert!(matches!(err, StatsError::SourceUnavailable { .. }));
        assert!(!config.output_dir.exists());
    }
}
