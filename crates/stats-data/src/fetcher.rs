//! Forwarding-history retrieval.
//!
//! Asks the node for its forwarding events one local calendar day at a time
//! and turns the `lncli fwdinghistory` JSON into [`ForwardingEvent`]s.

use std::process::Command;

use chrono::DateTime;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use stats_core::calculations::MSAT_PER_SAT;
use stats_core::error::{Result, StatsError};
use stats_core::models::{DateRange, ForwardingEvent};
use stats_core::time_utils::{DayWindow, ReportingTimezone};

/// Page size used when none is configured, matching lncli's own ceiling.
pub const DEFAULT_MAX_EVENTS: u32 = 50_000;

// ── Progress ──────────────────────────────────────────────────────────────────

/// One-way sink for fetch progress notifications.
pub trait ProgressSink {
    /// Announce how many units of work the fetch will take.
    fn set_total(&mut self, total: u64);
    /// Record `n` completed units.
    fn increment(&mut self, n: u64);
    /// Called once after the last unit.
    fn finish(&mut self) {}
}

/// Sink that discards every notification.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn set_total(&mut self, _total: u64) {}
    fn increment(&mut self, _n: u64) {}
}

// ── Source ────────────────────────────────────────────────────────────────────

/// Anything that can return the forwards settled inside a UTC window.
pub trait ForwardingSource {
    fn fetch_window(&mut self, window: &DayWindow) -> Result<Vec<ForwardingEvent>>;
}

/// Fetch all forwards for every day of `range`, one source call per day.
///
/// Progress is reported per day. Each day keeps only events inside its
/// half-open window, so a source that treats the end bound as inclusive
/// cannot count a midnight forward twice. Events come back sorted by
/// timestamp.
pub fn fetch_range<S, P>(
    source: &mut S,
    range: &DateRange,
    tz: &ReportingTimezone,
    progress: &mut P,
) -> Result<Vec<ForwardingEvent>>
where
    S: ForwardingSource + ?Sized,
    P: ProgressSink + ?Sized,
{
    info!("Fetching forwarding history for {} ({} days, {})", range, range.len(), tz);
    progress.set_total(range.len() as u64);

    let mut events = Vec::new();
    for date in range.days() {
        let window = tz.day_window(date);
        let mut day_events = source.fetch_window(&window)?;
        let returned = day_events.len();
        day_events.retain(|e| e.timestamp >= window.start && e.timestamp < window.end);
        if day_events.len() < returned {
            debug!(
                "{}: dropped {} events outside the window",
                window,
                returned - day_events.len()
            );
        }
        debug!("{}: {} forwarding events", window, day_events.len());
        events.extend(day_events);
        progress.increment(1);
    }
    progress.finish();

    events.sort_by_key(|e| e.timestamp);
    info!("Fetched {} forwarding events", events.len());
    Ok(events)
}

// ── LncliSource ───────────────────────────────────────────────────────────────

/// [`ForwardingSource`] backed by the `lncli` command-line client.
///
/// Runs `<program> <args..> fwdinghistory <start> <end> --max_events=N
/// --index_offset=K` and follows `last_offset_index` while pages come back
/// full.
#[derive(Debug, Clone)]
pub struct LncliSource {
    program: String,
    args: Vec<String>,
    max_events: u32,
}

impl LncliSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, max_events: u32) -> Self {
        Self {
            program: program.into(),
            args,
            max_events: max_events.max(1),
        }
    }

    fn command(&self, window: &DayWindow, index_offset: u64) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("fwdinghistory")
            .arg(window.start.timestamp().to_string())
            .arg(window.end.timestamp().to_string())
            .arg(format!("--max_events={}", self.max_events))
            .arg(format!("--index_offset={}", index_offset));
        cmd
    }

    fn fetch_page(&self, window: &DayWindow, index_offset: u64) -> Result<HistoryPage> {
        let output = self
            .command(window, index_offset)
            .output()
            .map_err(|e| StatsError::SourceUnavailable {
                window: window.to_string(),
                reason: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StatsError::SourceUnavailable {
                window: window.to_string(),
                reason: format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }

        parse_history(&output.stdout, window)
    }
}

impl ForwardingSource for LncliSource {
    fn fetch_window(&mut self, window: &DayWindow) -> Result<Vec<ForwardingEvent>> {
        let mut events = Vec::new();
        let mut offset = 0u64;
        loop {
            let page = self.fetch_page(window, offset)?;
            let count = page.events.len();
            events.extend(page.events);

            // A short page is the last one; a non-advancing offset would loop forever.
            if count < self.max_events as usize || page.last_offset_index <= offset {
                break;
            }
            debug!("{}: page full, continuing from offset {}", window, page.last_offset_index);
            offset = page.last_offset_index;
        }
        Ok(events)
    }
}

// ── JSON parsing ──────────────────────────────────────────────────────────────

/// One page of forwarding history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub events: Vec<ForwardingEvent>,
    pub last_offset_index: u64,
}

/// Parse `lncli fwdinghistory` stdout.
pub fn parse_history(stdout: &[u8], window: &DayWindow) -> Result<HistoryPage> {
    let malformed = |source| StatsError::MalformedOutput {
        window: window.to_string(),
        source,
    };

    let response: RawHistory = serde_json::from_slice(stdout).map_err(malformed)?;
    let events = response
        .forwarding_events
        .into_iter()
        .map(RawForwardingEvent::into_event)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(malformed)?;

    Ok(HistoryPage {
        events,
        last_offset_index: response.last_offset_index,
    })
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default)]
    forwarding_events: Vec<RawForwardingEvent>,
    #[serde(default, deserialize_with = "de_u64")]
    last_offset_index: u64,
}

/// lnd encodes 64-bit integers as JSON strings; older releases omit the
/// `_msat` fields and only report whole sats.
#[derive(Debug, Deserialize)]
struct RawForwardingEvent {
    #[serde(default, deserialize_with = "de_opt_u64")]
    timestamp: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    timestamp_ns: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    chan_id_in: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    chan_id_out: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    amt_in: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    amt_out: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    fee: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    amt_in_msat: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    amt_out_msat: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    fee_msat: Option<u64>,
}

impl RawForwardingEvent {
    fn into_event(self) -> std::result::Result<ForwardingEvent, serde_json::Error> {
        let timestamp = match (self.timestamp_ns, self.timestamp) {
            (Some(ns), _) if ns > 0 => DateTime::from_timestamp(
                (ns / 1_000_000_000) as i64,
                (ns % 1_000_000_000) as u32,
            ),
            (_, Some(secs)) => DateTime::from_timestamp(secs as i64, 0),
            _ => None,
        }
        .ok_or_else(|| serde_json::Error::custom("forwarding event without a valid timestamp"))?;

        let required = |amount: Option<u64>, field: &str| {
            amount.ok_or_else(|| serde_json::Error::custom(format!("forwarding event without {}", field)))
        };
        let amt_in_msat = msat_or_sat(self.amt_in_msat, self.amt_in, "amt_in")?;
        let amt_out_msat = msat_or_sat(self.amt_out_msat, self.amt_out, "amt_out")?;
        let fee_msat = msat_or_sat(self.fee_msat, self.fee, "fee")?;

        Ok(ForwardingEvent {
            timestamp,
            amt_in_msat: amt_in_msat.unwrap_or(0),
            amt_out_msat: required(amt_out_msat, "amt_out")?,
            fee_msat: required(fee_msat, "fee")?,
            chan_id_in: self.chan_id_in.unwrap_or(0),
            chan_id_out: self.chan_id_out.unwrap_or(0),
        })
    }
}

/// Prefer the `_msat` field; fall back to whole sats scaled to msat.
fn msat_or_sat(
    msat: Option<u64>,
    sat: Option<u64>,
    field: &str,
) -> std::result::Result<Option<u64>, serde_json::Error> {
    match (msat, sat) {
        (Some(m), _) => Ok(Some(m)),
        (None, Some(s)) => s
            .checked_mul(MSAT_PER_SAT)
            .map(Some)
            .ok_or_else(|| serde_json::Error::custom(format!("{} of {} sat overflows msat", field, s))),
        (None, None) => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum U64Field {
    Number(u64),
    Text(String),
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    match U64Field::deserialize(deserializer)? {
        U64Field::Number(n) => Ok(n),
        U64Field::Text(s) => s.trim().parse().map_err(D::Error::custom),
    }
}

fn de_opt_u64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    de_u64(deserializer).map(Some)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
