//! Plain-text year-in-review report.

use std::fmt::Write as _;

use stats_core::calculations::msat_to_btc;
use stats_core::formatting::{format_btc, format_number, format_ppm};
use stats_core::models::Superlative;
use stats_data::reporter::YearReview;

const MONTHLY_HEADERS: [&str; 4] = ["month", "total_forwarded_btc", "total_fees_btc", "avg_ppm"];

/// Render the full report: superlatives, monthly table, overall totals.
pub fn format_report(review: &YearReview) -> String {
    let mut out = String::new();
    write_superlatives(&mut out, review);
    out.push('\n');
    write_monthly_table(&mut out, review);
    out.push('\n');
    write_overall(&mut out, review);
    out
}

fn write_superlatives(out: &mut String, review: &YearReview) {
    let s = &review.summary;
    let _ = writeln!(out, "===== Year-in-Review Summary =====");
    if let (Some(first), Some(last)) = (review.first_day, review.last_day) {
        let _ = writeln!(out, "Period: {} to {}", first, last);
    }
    let _ = writeln!(
        out,
        "Highest forwarding day: {}",
        day_btc(s.highest_forwarding_day)
    );
    let _ = writeln!(out, "Highest fees day: {}", day_btc(s.highest_fees_day));
    let _ = writeln!(
        out,
        "Highest avg PPM day: {}",
        s.highest_avg_ppm_day
            .map(|sup| format!("{} \u{2192} {}", sup.date, format_ppm(sup.value)))
            .unwrap_or_else(|| "n/a".to_string())
    );
    let _ = writeln!(
        out,
        "Largest single forward: {}",
        single_btc(s.largest_single_forward)
    );
    let _ = writeln!(out, "Largest single fee: {}", single_btc(s.largest_single_fee));
}

fn day_btc(sup: Option<Superlative>) -> String {
    match sup {
        Some(sup) => format!("{} \u{2192} {}", sup.date, format_btc(msat_to_btc(sup.value), 4)),
        None => "n/a".to_string(),
    }
}

fn single_btc(sup: Option<Superlative>) -> String {
    match sup {
        Some(sup) => format!("{} on {}", format_btc(msat_to_btc(sup.value), 4), sup.date),
        None => "n/a".to_string(),
    }
}

fn write_monthly_table(out: &mut String, review: &YearReview) {
    let rows: Vec<[String; 4]> = review
        .monthly
        .iter()
        .map(|m| {
            [
                m.month.to_string(),
                format!("{:.6}", m.total_forwarded_btc()),
                format!("{:.6}", m.total_fees_btc()),
                m.avg_ppm.to_string(),
            ]
        })
        .collect();
    let total = [
        "TOTAL".to_string(),
        format!("{:.6}", review.total_forwarded_btc()),
        format!("{:.6}", review.total_fees_btc()),
        review.overall_ppm.to_string(),
    ];

    let mut widths = MONTHLY_HEADERS.map(str::len);
    for row in rows.iter().chain(std::iter::once(&total)) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let header = MONTHLY_HEADERS.map(str::to_string);
    let _ = writeln!(out, "Monthly Totals (with overall totals/averages):");
    let _ = writeln!(out, "{}", table_line(&header, &widths));
    for row in &rows {
        let _ = writeln!(out, "{}", table_line(row, &widths));
    }
    let table_width = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    let _ = writeln!(out, "{}", "-".repeat(table_width));
    let _ = writeln!(out, "{}", table_line(&total, &widths));
}

/// First column left-aligned, the rest right-aligned, two spaces apart.
fn table_line(cells: &[String; 4], widths: &[usize; 4]) -> String {
    let mut line = format!("{:<w$}", cells[0], w = widths[0]);
    for (cell, w) in cells.iter().zip(widths).skip(1) {
        let _ = write!(line, "  {:>w$}", cell, w = *w);
    }
    line
}

fn write_overall(out: &mut String, review: &YearReview) {
    let _ = writeln!(out, "Overall Totals & Averages:");
    let _ = writeln!(
        out,
        " - Total BTC forwarded: {:.6}",
        review.total_forwarded_btc()
    );
    let _ = writeln!(
        out,
        " - Total BTC fees earned: {:.6}",
        review.total_fees_btc()
    );
    let _ = writeln!(
        out,
        " - Average BTC forwarded per month: {:.6}",
        review.avg_forwarded_per_month_btc
    );
    let _ = writeln!(out, " - Overall average PPM: {}", review.overall_ppm);
    let _ = writeln!(
        out,
        " - Forwards: {}",
        format_number(review.total_tx_count as f64, 0)
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
