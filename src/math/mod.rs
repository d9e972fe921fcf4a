// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


use hifitime::{Duration, Epoch};

/// Statistics of a set of values after sigma clipping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ClippedStats {
    pub(crate) mean: f64,
    pub(crate) median: f64,
    /// Population standard deviation (no Bessel correction).
    pub(crate) stdev: f64,
    /// The largest finite value, clipped or not.
    pub(crate) max: f64,
    /// The smallest finite value, clipped or not.
    pub(crate) min: f64,
    /// The number of values that survived clipping.
    pub(crate) num_used: usize,
}

impl ClippedStats {
    fn nan() -> ClippedStats {
        ClippedStats {
            mean: f64::NAN,
            median: f64::NAN,
            stdev: f64::NAN,
            max: f64::NAN,
            min: f64::NAN,
            num_used: 0,
        }
    }
}

/// Iteratively discard values further than `sigma` standard deviations from
/// the mean, until nothing more is discarded or `max_iters` passes have been
/// made. Non-finite values are ignored. If nothing is left, all statistics are
/// NaN.
pub(crate) fn sigma_clipped_stats(values: &[f64], sigma: f64, max_iters: u32) -> ClippedStats {
    let mut kept: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if kept.is_empty() {
        return ClippedStats::nan();
    }
    let max = kept.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = kept.iter().copied().fold(f64::INFINITY, f64::min);

    for _ in 0..max_iters {
        let (mean, stdev) = mean_and_stdev(&kept);
        // A spread at rounding level can't be clipped meaningfully.
        if stdev <= f64::EPSILON * mean.abs() {
            break;
        }
        let limit = sigma * stdev;
        let before = kept.len();
        kept.retain(|v| (v - mean).abs() <= limit);
        if kept.len() == before || kept.is_empty() {
            break;
        }
    }
    if kept.is_empty() {
        return ClippedStats { max, min, ..ClippedStats::nan() };
    }

    let (mean, stdev) = mean_and_stdev(&kept);
    ClippedStats {
        mean,
        median: median(&mut kept),
        stdev,
        max,
        min,
        num_used: kept.len(),
    }
}

fn mean_and_stdev(values: &[f64]) -> (f64, f64) {
    if let Some(&first) = values.first() {
        if values.iter().all(|&v| v == first) {
            return (first, 0.0);
        }
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// The median of finite values. The input is sorted in place.
pub(crate) fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// The median of ascending timestamps. With an even number of timestamps, the
/// midpoint of the middle two is used.
pub(crate) fn median_time(times: &[Epoch]) -> Option<Epoch> {
    let mid = times.len() / 2;
    match times.len() {
        0 => None,
        n if n % 2 == 0 => {
            let (a, b) = (times[mid - 1], times[mid]);
            Some(a + Duration::from_total_nanoseconds((b - a).total_nanoseconds() / 2))
        }
        _ => Some(times[mid]),
    }
}
