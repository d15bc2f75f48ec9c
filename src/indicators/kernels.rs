// =============================================================================
// Numeric kernels shared by the indicator algorithms
// =============================================================================
//
// Every kernel returns a vector with exactly one entry per input value.
// Entries that cannot be computed (not enough history, NaN inside the window,
// zero period) are NaN.  No kernel divides by zero or panics on short input.
// =============================================================================

/// Simple moving average with an O(1) add/remove sliding update.
///
/// The running sum holds deviations from an anchor value inside the window,
/// so a constant window averages back to exactly that value.  The anchor is
/// the newest value when the window is (re)seeded and is replaced once it
/// slides out.  A window containing any non-finite value produces NaN and
/// forces a re-seed once the gap has left.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || len < period {
        return out;
    }

    let period_f = period as f64;
    let mut gaps = 0usize;
    // (index, value) of the anchor and the window's summed deviation from it
    let mut anchor: Option<(usize, f64)> = None;
    let mut deviation = 0.0;

    for i in 0..len {
        if !values[i].is_finite() {
            gaps += 1;
        }
        if i >= period && !values[i - period].is_finite() {
            gaps -= 1;
        }
        if i + 1 < period {
            continue;
        }
        if gaps > 0 {
            anchor = None;
            continue;
        }

        let start = i + 1 - period;
        let base = match anchor {
            Some((at, base)) if at >= start => {
                deviation += values[i] - base;
                deviation -= values[start - 1] - base;
                base
            }
            _ => {
                let base = values[i];
                deviation = values[start..=i].iter().map(|v| v - base).sum();
                anchor = Some((i, base));
                base
            }
        };
        out[i] = base + deviation / period_f;
    }

    out
}

/// Linearly weighted moving average.
///
/// The value at lag `j` (0 = newest) carries weight `period - j`; the divisor
/// is `period * (period + 1) / 2`.  Any NaN in the window yields NaN.
pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || len < period {
        return out;
    }

    let divisor = (period * (period + 1)) as f64 / 2.0;
    for i in (period - 1)..len {
        let mut acc = 0.0;
        for j in 0..period {
            let v = values[i - j];
            if !v.is_finite() {
                acc = f64::NAN;
                break;
            }
            acc += v * (period - j) as f64;
        }
        out[i] = acc / divisor;
    }

    out
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values, placed at index `period - 1`.
///
/// multiplier k = 2 / (period + 1)
/// EMA_t        = value_t * k + EMA_{t-1} * (1 - k)
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || len < period {
        return out;
    }

    let k = 2.0 / (period + 1) as f64;
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;

    let mut prev = seed;
    for i in period..len {
        prev = values[i] * k + prev * (1.0 - k);
        out[i] = prev;
    }

    out
}

/// Exponential moving average seeded directly with the first value.
///
/// Defined from index 0 onward; used by MACD for both its price EMAs and its
/// signal line.
pub fn ema_from_first(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    if period == 0 {
        return vec![f64::NAN; len];
    }
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let k = 2.0 / (period + 1) as f64;
    let mut out = Vec::with_capacity(len);
    out.push(first);

    let mut prev = first;
    for &v in &values[1..] {
        prev = v * k + prev * (1.0 - k);
        out.push(prev);
    }

    out
}

/// Lowest value of the `period`-long window ending at `end` (inclusive).
///
/// NaN when the window is incomplete or contains NaN.
pub fn lowest(values: &[f64], end: usize, period: usize) -> f64 {
    window(values, end, period).map_or(f64::NAN, |w| {
        w.iter().try_fold(f64::INFINITY, |acc, &v| {
            if v.is_finite() {
                Some(acc.min(v))
            } else {
                None
            }
        })
        .unwrap_or(f64::NAN)
    })
}

/// Highest value of the `period`-long window ending at `end` (inclusive).
///
/// NaN when the window is incomplete or contains NaN.
pub fn highest(values: &[f64], end: usize, period: usize) -> f64 {
    window(values, end, period).map_or(f64::NAN, |w| {
        w.iter().try_fold(f64::NEG_INFINITY, |acc, &v| {
            if v.is_finite() {
                Some(acc.max(v))
            } else {
                None
            }
        })
        .unwrap_or(f64::NAN)
    })
}

/// Population standard deviation of `window` around a precomputed `mean`.
pub fn population_std_dev(window: &[f64], mean: f64) -> f64 {
    if window.is_empty() {
        return f64::NAN;
    }
    let variance =
        window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
    variance.sqrt()
}

fn window(values: &[f64], end: usize, period: usize) -> Option<&[f64]> {
    if period == 0 || end >= values.len() || end + 1 < period {
        return None;
    }
    Some(&values[end + 1 - period..=end])
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn close_enough(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    // ---- sma -------------------------------------------------------------

    #[test]
    fn sma_basic_window() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out.len(), 5);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!(close_enough(out[2], 2.0));
        assert!(close_enough(out[3], 3.0));
        assert!(close_enough(out[4], 4.0));
    }

    #[test]
    fn sma_of_constant_series_is_exact() {
        for v in [0.1, 100.3] {
            let out = sma(&[v; 25], 3);
            assert!(out[2..].iter().all(|&m| m == v), "{v}: {out:?}");
        }
    }

    #[test]
    fn sma_recovers_after_anchor_leaves() {
        let values: Vec<f64> = (0..40).map(|i| ((i * 7) % 11) as f64 * 0.3).collect();
        let out = sma(&values, 4);
        for i in 3..values.len() {
            let direct = values[i - 3..=i].iter().sum::<f64>() / 4.0;
            assert!(close_enough(out[i], direct), "index {i}");
        }
    }

    #[test]
    fn sma_zero_period_is_all_nan() {
        let out = sma(&[1.0, 2.0, 3.0], 0);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_skips_windows_containing_nan() {
        let out = sma(&[f64::NAN, 2.0, 4.0, 6.0], 2);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!(close_enough(out[2], 3.0));
        assert!(close_enough(out[3], 5.0));
    }

    // ---- wma -------------------------------------------------------------

    #[test]
    fn wma_weights_newest_highest() {
        // (3*3 + 2*2 + 1*1) / 6 = 14/6
        let out = wma(&[1.0, 2.0, 3.0], 3);
        assert!(close_enough(out[2], 14.0 / 6.0));
    }

    #[test]
    fn wma_propagates_nan() {
        let out = wma(&[1.0, f64::NAN, 3.0, 4.0], 2);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert!(close_enough(out[3], (4.0 * 2.0 + 3.0) / 3.0));
    }

    // ---- ema -------------------------------------------------------------

    #[test]
    fn ema_seed_is_sma() {
        let values: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let out = ema(&values, 5);
        assert!(out[3].is_nan());
        assert!(close_enough(out[4], 3.0));

        let k = 2.0 / 6.0;
        assert!(close_enough(out[5], 6.0 * k + 3.0 * (1.0 - k)));
    }

    #[test]
    fn ema_from_first_starts_at_index_zero() {
        let out = ema_from_first(&[10.0, 20.0], 3);
        assert_eq!(out[0], 10.0);
        assert!(close_enough(out[1], 20.0 * 0.5 + 10.0 * 0.5));
        assert!(ema_from_first(&[], 3).is_empty());
    }

    // ---- extremes / std dev ----------------------------------------------

    #[test]
    fn extremes_over_window() {
        let values = [5.0, 1.0, 7.0, 3.0];
        assert_eq!(lowest(&values, 3, 3), 1.0);
        assert_eq!(highest(&values, 3, 3), 7.0);
        assert!(lowest(&values, 1, 3).is_nan());
        assert!(highest(&[1.0, f64::NAN], 1, 2).is_nan());
    }

    #[test]
    fn std_dev_of_flat_window_is_zero() {
        assert_eq!(population_std_dev(&[4.0; 5], 4.0), 0.0);
        assert!(close_enough(population_std_dev(&[2.0, 4.0], 3.0), 1.0));
    }
}
