use std::fmt;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone as _, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{Result, StatsError};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly, no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── DayWindow ─────────────────────────────────────────────────────────────────

/// The half-open UTC interval `[start, end)` covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl fmt::Display for DayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date)
    }
}

// ── ReportingTimezone ─────────────────────────────────────────────────────────

/// The timezone whose calendar days events are bucketed into.
///
/// Unlike a lenient display setting, an unknown name is an error: silently
/// falling back would move forwards between days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingTimezone {
    tz: Tz,
}

impl ReportingTimezone {
    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Resolve an IANA name, or `"auto"` for the system timezone.
    pub fn resolve(name: &str) -> Result<Self> {
        let name = if name.eq_ignore_ascii_case("auto") {
            let detected = get_system_timezone();
            debug!("Resolved auto timezone to {}", detected);
            detected
        } else {
            name.to_string()
        };
        name.parse::<Tz>()
            .map(|tz| Self { tz })
            .map_err(|_| StatsError::Config(format!("unknown timezone {:?}", name)))
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Calendar day of `ts` in this timezone.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.tz).date_naive()
    }

    /// UTC instant at which local `date` begins.
    ///
    /// Where a DST transition skips midnight the day starts at the first
    /// valid local instant after it.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let mut local = date.and_time(NaiveTime::MIN);
        for _ in 0..=4 {
            match self.tz.from_local_datetime(&local) {
                LocalResult::Single(dt) => return dt.with_timezone(&Utc),
                LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
                LocalResult::None => local += Duration::minutes(30),
            }
        }
        // No zone has a gap longer than two hours around midnight.
        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
    }

    /// The UTC window covering local `date`.
    pub fn day_window(&self, date: NaiveDate) -> DayWindow {
        let next = date.succ_opt().unwrap_or(date);
        DayWindow {
            date,
            start: self.start_of_day(date),
            end: self.start_of_day(next),
        }
    }
}

impl Default for ReportingTimezone {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for ReportingTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
