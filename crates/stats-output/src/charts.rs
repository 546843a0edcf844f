//! SVG charts of the daily table.

use std::ops::Range;
use std::path::Path;

use plotters::prelude::*;

use stats_core::error::{BoxError, Result, StatsError};
use stats_core::models::{DailyRecord, DATE_FORMAT};

pub const FORWARDED_CHART_FILE: &str = "daily_forwarded_btc.svg";
pub const FEES_CHART_FILE: &str = "daily_fees_sats.svg";

const CHART_SIZE: (u32, u32) = (1400, 600);
const MAX_X_LABELS: usize = 12;

const FORWARDED_COLOR: RGBColor = BLUE;
const MOVING_AVG_COLOR: RGBColor = RED;
const FEES_COLOR: RGBColor = RGBColor(255, 165, 0);
const PPM_COLOR: RGBColor = RGBColor(128, 0, 128);

/// Line chart of daily forwarded BTC with its 5-day moving average.
pub fn render_forwarded_chart(daily: &[DailyRecord], path: &Path) -> Result<()> {
    draw_forwarded(daily, path).map_err(|e| StatsError::write(path, e))?;
    tracing::info!("Rendered forwarded chart to {}", path.display());
    Ok(())
}

/// Daily fees in sats as bars, with the daily fee rate on a secondary axis.
pub fn render_fees_chart(daily: &[DailyRecord], path: &Path) -> Result<()> {
    draw_fees(daily, path).map_err(|e| StatsError::write(path, e))?;
    tracing::info!("Rendered fees chart to {}", path.display());
    Ok(())
}

fn draw_forwarded(daily: &[DailyRecord], path: &Path) -> std::result::Result<(), BoxError> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = padded_max(
        daily
            .iter()
            .flat_map(|d| [d.total_forwarded_btc(), d.moving_avg_5d_btc]),
    );

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily Forwarded BTC", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range(daily), 0f64..y_max)?;

    let label_for = |x: &f64| date_label(daily, *x);
    chart
        .configure_mesh()
        .x_labels(daily.len().clamp(1, MAX_X_LABELS))
        .x_label_formatter(&label_for)
        .x_desc("Date")
        .y_desc("Forwarded BTC")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            daily
                .iter()
                .enumerate()
                .map(|(i, d)| (i as f64, d.total_forwarded_btc())),
            FORWARDED_COLOR.stroke_width(2),
        ))?
        .label("Daily Forwarded BTC")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], FORWARDED_COLOR));

    let moving_avg: Vec<(f64, f64)> = daily
        .iter()
        .enumerate()
        .map(|(i, d)| (i as f64, d.moving_avg_5d_btc))
        .collect();
    chart
        .draw_series(
            dash_segments(&moving_avg)
                .into_iter()
                .map(|dash| PathElement::new(dash, MOVING_AVG_COLOR.stroke_width(2))),
        )?
        .label("5-Day MA")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MOVING_AVG_COLOR));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_fees(daily: &[DailyRecord], path: &Path) -> std::result::Result<(), BoxError> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let fees_sat = |d: &DailyRecord| d.total_fees_msat as f64 / 1_000.0;
    let fees_max = padded_max(daily.iter().map(fees_sat));
    let ppm_max = padded_max(daily.iter().map(|d| d.avg_ppm as f64));

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily Fees Earned and Average PPM", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .right_y_label_area_size(80)
        .build_cartesian_2d(x_range(daily), 0f64..fees_max)?
        .set_secondary_coord(x_range(daily), 0f64..ppm_max);

    let label_for = |x: &f64| date_label(daily, *x);
    chart
        .configure_mesh()
        .x_labels(daily.len().clamp(1, MAX_X_LABELS))
        .x_label_formatter(&label_for)
        .x_desc("Date")
        .y_desc("Fees Earned (sats)")
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc("Average PPM")
        .draw()?;

    let bar_style = FEES_COLOR.mix(0.7).filled();
    chart
        .draw_series(daily.iter().enumerate().map(|(i, d)| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, fees_sat(d))], bar_style)
        }))?
        .label("Fees Earned (sats)")
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], bar_style));

    chart
        .draw_secondary_series(LineSeries::new(
            daily
                .iter()
                .enumerate()
                .map(|(i, d)| (i as f64, d.avg_ppm as f64)),
            PPM_COLOR.stroke_width(2),
        ))?
        .label("Average PPM")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], PPM_COLOR));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Split a polyline into dashes, keeping the leading part of every segment.
fn dash_segments(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    const DASH: f64 = 0.6;
    points
        .windows(2)
        .map(|pair| {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            vec![(x0, y0), (x0 + (x1 - x0) * DASH, y0 + (y1 - y0) * DASH)]
        })
        .collect()
}

/// One unit per day, with half a unit of room on each side for bars.
fn x_range(daily: &[DailyRecord]) -> Range<f64> {
    -0.5..(daily.len().max(1) as f64 - 0.5)
}

/// Upper y bound with 10% headroom; a flat zero series still gets an axis.
fn padded_max(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

/// Date label for an x tick; ticks between days stay blank.
fn date_label(daily: &[DailyRecord], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    daily
        .get(idx as usize)
        .map(|d| d.date.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_days(n: u32) -> Vec<DailyRecord> {
        (0..n)
            .map(|i| {
                let date =
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64);
                DailyRecord {
                    tx_count: i,
                    total_forwarded_msat: (i as u64 + 1) * 10_000_000_000,
                    total_fees_msat: (i as u64 + 1) * 5_000_000,
                    avg_ppm: 500,
                    moving_avg_5d_btc: 0.1 * (i as f64 + 1.0),
                    ..DailyRecord::empty(date)
                }
            })
            .collect()
    }

    #[test]
    fn test_forwarded_chart_is_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(FORWARDED_CHART_FILE);
        render_forwarded_chart(&sample_days(10), &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Daily Forwarded BTC"));
    }

    #[test]
    fn test_fees_chart_is_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(FEES_CHART_FILE);
        render_fees_chart(&sample_days(10), &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn test_all_zero_single_day_renders() {
        let tmp = TempDir::new().unwrap();
        let day = vec![DailyRecord::empty(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())];
        render_forwarded_chart(&day, &tmp.path().join(FORWARDED_CHART_FILE)).unwrap();
        render_fees_chart(&day, &tmp.path().join(FEES_CHART_FILE)).unwrap();
    }

    #[test]
    fn test_missing_directory_is_write_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope").join(FEES_CHART_FILE);
        let err = render_fees_chart(&sample_days(3), &path).unwrap_err();
        assert!(matches!(err, StatsError::Write { .. }));
    }

    #[test]
    fn test_date_label() {
        let days = sample_days(3);
        assert_eq!(date_label(&days, 0.0), "2024-01-01");
        assert_eq!(date_label(&days, 2.0), "2024-01-03");
        assert_eq!(date_label(&days, 1.5), "");
        assert_eq!(date_label(&days, 3.0), "");
        assert_eq!(date_label(&days, -1.0), "");
    }

    #[test]
    fn test_dash_segments() {
        let dashes = dash_segments(&[(0.0, 0.0), (1.0, 10.0), (2.0, 10.0)]);
        assert_eq!(dashes.len(), 2);
        assert_eq!(dashes[0][0], (0.0, 0.0));
        assert!((dashes[0][1].0 - 0.6).abs() < 1e-12);
        assert!((dashes[0][1].1 - 6.0).abs() < 1e-12);
        assert_eq!(dash_segments(&[(0.0, 1.0)]).len(), 0);
    }

    #[test]
    fn test_padded_max() {
        assert_eq!(padded_max([0.0, 0.0].into_iter()), 1.0);
        assert!((padded_max([1.0, 2.0].into_iter()) - 2.2).abs() < 1e-12);
    }
}
