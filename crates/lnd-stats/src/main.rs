mod bootstrap;
mod pipeline;

use anyhow::{Context, Result};
use stats_core::settings::Settings;
use stats_data::fetcher::{LncliSource, NoProgress, ProgressSink};
use stats_output::progress::TerminalProgress;
use stats_output::report_view::format_report;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("lnd-stats v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Range: {}..={}, timezone: {}, output: {}",
        settings.start,
        settings.end,
        settings.timezone,
        settings.output_dir.display()
    );

    let mut source = LncliSource::new(
        settings.lncli.clone(),
        settings.lncli_args.clone(),
        settings.max_events,
    );
    let mut progress: Box<dyn ProgressSink> = if settings.no_progress {
        Box::new(NoProgress)
    } else {
        Box::new(TerminalProgress::new())
    };

    let outcome = pipeline::execute(&settings, &mut source, progress.as_mut())
        .context("lnd-stats run failed")?;
    tracing::info!(
        "Processed {} forwards into {} monthly rows",
        outcome.event_count,
        outcome.review.monthly.len()
    );

    print!("{}", format_report(&outcome.review));
    println!();
    println!("Files written:");
    for path in outcome.files.iter() {
        println!(" - {}", path.display());
    }

    Ok(())
}
