//! Unit conversion and the small numeric helpers shared by the aggregation
//! stages.

/// Millisatoshi per satoshi.
pub const MSAT_PER_SAT: u64 = 1_000;

/// Satoshi per bitcoin.
pub const SAT_PER_BTC: u64 = 100_000_000;

/// Millisatoshi per bitcoin.
pub const MSAT_PER_BTC: u64 = MSAT_PER_SAT * SAT_PER_BTC;

/// Window of the trailing moving average, in days.
pub const MOVING_AVERAGE_DAYS: usize = 5;

// ── Units ─────────────────────────────────────────────────────────────────────

/// Convert millisatoshi to BTC.
pub fn msat_to_btc(msat: u64) -> f64 {
    msat as f64 / MSAT_PER_BTC as f64
}

/// Convert millisatoshi to whole satoshi, truncating sub-sat remainders.
pub fn msat_to_sat(msat: u64) -> u64 {
    msat / MSAT_PER_SAT
}

// ── Fee rate ──────────────────────────────────────────────────────────────────

/// Fee rate in parts per million, `round(fees / forwarded * 1e6)`.
///
/// Computed in integer arithmetic (round half up) so that the same totals
/// always yield the same rate. Returns `0` when nothing was forwarded.
///
/// # Examples
///
/// ```
/// use stats_core::calculations::fee_rate_ppm;
///
/// assert_eq!(fee_rate_ppm(100_000, 100_000_000_000), 1);
/// assert_eq!(fee_rate_ppm(500_000_000, 300_000_000_000), 1667);
/// assert_eq!(fee_rate_ppm(42, 0), 0);
/// ```
pub fn fee_rate_ppm(fees_msat: u64, forwarded_msat: u64) -> u64 {
    if forwarded_msat == 0 {
        return 0;
    }
    let numerator = fees_msat as u128 * 1_000_000 * 2 + forwarded_msat as u128;
    let denominator = forwarded_msat as u128 * 2;
    (numerator / denominator).min(u64::MAX as u128) as u64
}

// ── Series helpers ────────────────────────────────────────────────────────────

/// Trailing mean over `window` values ending at each index.
///
/// The first `window - 1` positions average over the values available so
/// far instead of padding with zeros.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut running = 0.0;
    for (i, value) in values.iter().enumerate() {
        running += value;
        if i >= window {
            running -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(running / n as f64);
    }
    out
}

/// Compute the `p`-th percentile of a **sorted** slice using standard linear
/// interpolation (the same algorithm used by NumPy's `percentile` function).
///
/// Returns `0.0` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}
