use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::models::DateRange;
use crate::time_utils::ReportingTimezone;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Generate LND daily forwarding CSV, charts, and year-in-review summary
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lnd-stats",
    about = "Generate LND daily forwarding CSV, charts, and year-in-review summary",
    version
)]
pub struct Settings {
    /// Start date YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub start: String,

    /// End date YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub end: String,

    /// Directory to save CSV and charts
    #[arg(long, default_value = "lnd_stats")]
    pub output_dir: PathBuf,

    /// Timezone whose calendar days forwards are bucketed into ("auto" = system)
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Path to the lncli binary
    #[arg(long, default_value = "lncli")]
    pub lncli: String,

    /// Extra argument passed to lncli before the subcommand (repeatable)
    #[arg(long = "lncli-arg", allow_hyphen_values = true)]
    pub lncli_args: Vec<String>,

    /// Maximum events requested per fwdinghistory page
    #[arg(long, default_value = "50000", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_events: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Do not draw the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.lnd-stats/last_used.json`.
///
/// Only node-connection and placement settings are remembered; the date range
/// is always given explicitly.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lncli: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lncli_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    /// Uses `~/.lnd-stats/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".lnd-stats").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge with last-used params where no explicit
    /// CLI value was provided, then persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation: accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        // Build raw ArgMatches so we can query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());

        // Parse into the typed struct using the same args.
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("Could not clear {}: {}", config_path.display(), e);
            }
            return settings.apply_debug_flag();
        }

        let last = LastUsedParams::load_from(config_path);
        let previous_timezone = last.timezone.clone();

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "lncli") {
            if let Some(v) = last.lncli {
                settings.lncli = v;
            }
        }
        // NOTE: clap stores the arg id using the *field name* (underscores),
        // not the long-flag spelling (hyphens).
        if !is_arg_explicitly_set(&matches, "lncli_args") && !last.lncli_args.is_empty() {
            settings.lncli_args = last.lncli_args;
        }
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }

        settings = settings.apply_debug_flag();

        // Persist current settings for next run. An unknown timezone is
        // never stored; the last good one stays.
        let mut params = LastUsedParams::from(&settings);
        if params.timezone.is_none() {
            params.timezone = previous_timezone;
        }
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!("Could not persist {}: {}", config_path.display(), e);
        }

        settings
    }

    /// The validated, inclusive date range.
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::parse(&self.start, &self.end)
    }

    /// The reporting timezone, resolving `"auto"`.
    pub fn reporting_timezone(&self) -> Result<ReportingTimezone> {
        ReportingTimezone::resolve(&self.timezone)
    }

    /// `--debug` overrides the log level.
    fn apply_debug_flag(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            timezone: is_persistable_timezone(&s.timezone).then(|| s.timezone.clone()),
            lncli: Some(s.lncli.clone()),
            lncli_args: s.lncli_args.clone(),
            output_dir: Some(s.output_dir.clone()),
        }
    }
}

/// `"auto"` or a name `chrono-tz` knows.
fn is_persistable_timezone(name: &str) -> bool {
    name.eq_ignore_ascii_case("auto") || ReportingTimezone::validate_timezone(name)
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
