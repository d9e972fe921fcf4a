// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Summary statistics of telemetry.
//!
//! A (possibly filtered) series is cut into segments according to an
//! [`AveragingPolicy`], and each segment is reduced to sigma-clipped
//! statistics at a representative time.

mod error;
#[cfg(test)]
mod tests;

pub use error::AveragingError;

use std::ops::Range;

use hifitime::{Duration, Epoch};
use indexmap::IndexMap;
use log::{debug, trace};

use crate::{
    constants::{DEFAULT_CLIP_SIGMA, DEFAULT_MAX_CLIP_ITERS},
    math::{median_time, sigma_clipped_stats},
    time_series::TimeSeries,
};

/// Sigma-clipping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipParams {
    pub sigma: f64,
    pub max_iters: u32,
}

impl Default for ClipParams {
    fn default() -> Self {
        ClipParams {
            sigma: DEFAULT_CLIP_SIGMA,
            max_iters: DEFAULT_MAX_CLIP_ITERS,
        }
    }
}

/// How a series is cut into segments before its statistics are calculated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AveragingPolicy {
    /// Consecutive 24-hour buckets starting at the first sample.
    DailyMeans,

    /// One segment per block of the series.
    BlockMeans,

    /// Bins of a fixed duration, laid out from the start of every block.
    TimeInterval(Duration),

    /// One segment per value of a dependency, pooling every sample taken
    /// while the dependency held that value.
    EveryChange,

    /// The whole series is one segment.
    None,
}

/// The statistics of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStats {
    /// The median time of the segment's samples.
    pub time: Epoch,
    pub mean: f64,
    pub median: f64,
    pub stdev: f64,
    pub max: f64,
    pub min: f64,

    /// For every-change statistics, the dependency value of this segment.
    pub label: Option<String>,
}

/// The statistics of every segment of a series, in time order (or in order of
/// first appearance for every-change statistics).
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryStats {
    pub identifier: String,
    pub unit: Option<String>,
    pub segments: Vec<SegmentStats>,
}

impl TelemetryStats {
    pub fn new<S: Into<String>>(identifier: S, unit: Option<String>) -> TelemetryStats {
        TelemetryStats {
            identifier: identifier.into(),
            unit,
            segments: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn times(&self) -> Vec<Epoch> {
        self.segments.iter().map(|s| s.time).collect()
    }

    pub fn means(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.mean).collect()
    }

    pub fn medians(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.median).collect()
    }

    pub fn stdevs(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.stdev).collect()
    }

    /// Append the segments of a later query.
    pub fn extend(&mut self, other: TelemetryStats) {
        if self.unit.is_none() {
            self.unit = other.unit;
        }
        self.segments.extend(other.segments);
    }
}

/// Calculate the statistics of `series` under `policy`. Every-change
/// statistics also need the `dependency` whose values define the segments.
/// Change-only series are materialised first.
pub fn calculate_statistics(
    series: &TimeSeries,
    policy: AveragingPolicy,
    dependency: Option<&TimeSeries>,
    clip: ClipParams,
) -> Result<TelemetryStats, AveragingError> {
    let materialised;
    let series = if series.is_dense() {
        series
    } else {
        materialised = series.change_only_add_points();
        &materialised
    };

    let stats = match policy {
        AveragingPolicy::DailyMeans => daily_stats(series, clip)?,
        AveragingPolicy::BlockMeans => block_stats(series, clip)?,
        AveragingPolicy::TimeInterval(bin) => timed_stats(series, bin, clip)?,
        AveragingPolicy::EveryChange => {
            let dependency = dependency
                .ok_or_else(|| AveragingError::MissingDependency(series.identifier().to_string()))?;
            every_change_stats(series, dependency, clip)?
        }
        AveragingPolicy::None => full_stats(series, clip)?,
    };
    debug!(
        "{}: {} segments from {} samples ({policy:?})",
        stats.identifier,
        stats.len(),
        series.len()
    );
    Ok(stats)
}

/// Statistics of each consecutive 24-hour bucket, starting at the first
/// sample. The last bucket is closed at its end, so a last sample exactly a
/// whole number of days after the first belongs to the bucket before it.
/// Buckets without samples are skipped.
pub fn daily_stats(series: &TimeSeries, clip: ClipParams) -> Result<TelemetryStats, AveragingError> {
    let values = series.numeric()?;
    let mut stats = TelemetryStats::new(series.identifier(), series.unit().map(String::from));
    let anchor = match series.timestamps().first() {
        Some(&t) => t,
        None => return Ok(stats),
    };
    let day = Duration::from_days(1.0);
    for range in bin_ranges(series.timestamps(), 0..series.len(), anchor, day, true) {
        stats
            .segments
            .push(segment(&series.timestamps()[range.clone()], &values[range], clip));
    }
    Ok(stats)
}

/// Statistics of each block.
pub fn block_stats(series: &TimeSeries, clip: ClipParams) -> Result<TelemetryStats, AveragingError> {
    let values = series.numeric()?;
    let mut stats = TelemetryStats::new(series.identifier(), series.unit().map(String::from));
    stats.segments = series
        .block_ranges()
        .filter(|r| !r.is_empty())
        .map(|r| segment(&series.timestamps()[r.clone()], &values[r], clip))
        .collect();
    Ok(stats)
}

/// Statistics of fixed-duration bins. Bins never span blocks; each block's
/// bins start at its first sample. A partial last bin is kept when it has any
/// samples.
pub fn timed_stats(
    series: &TimeSeries,
    bin: Duration,
    clip: ClipParams,
) -> Result<TelemetryStats, AveragingError> {
    if bin.total_nanoseconds() <= 0 {
        return Err(AveragingError::NonPositiveInterval(bin));
    }
    let values = series.numeric()?;
    let times = series.timestamps();
    let mut stats = TelemetryStats::new(series.identifier(), series.unit().map(String::from));
    for block in series.block_ranges().filter(|r| !r.is_empty()) {
        let anchor = times[block.start];
        for range in bin_ranges(times, block, anchor, bin, false) {
            stats
                .segments
                .push(segment(&times[range.clone()], &values[range], clip));
        }
    }
    Ok(stats)
}

/// Statistics of the samples taken while `dependency` held each of its values.
/// Samples from separate visits to the same value are pooled. `dependency` is
/// step-held onto the timestamps of `series`; samples before the first
/// dependency sample have no dependency value and are ignored.
pub fn every_change_stats(
    series: &TimeSeries,
    dependency: &TimeSeries,
    clip: ClipParams,
) -> Result<TelemetryStats, AveragingError> {
    let values = series.numeric()?;
    let times = series.timestamps();
    let mut stats = TelemetryStats::new(series.identifier(), series.unit().map(String::from));
    if series.is_empty() || dependency.is_empty() {
        return Ok(stats);
    }

    let (held, report) = dependency.interpolate_with_report(times);
    let skip = report.dropped.len();
    if skip > 0 {
        trace!(
            "{}: {skip} samples precede {} and have no dependency value",
            series.identifier(),
            dependency.identifier()
        );
    }

    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (i, row) in (skip..series.len()).enumerate() {
        groups.entry(held.values().label(i)).or_default().push(row);
    }

    for (label, rows) in groups {
        let group_times: Vec<Epoch> = rows.iter().map(|&r| times[r]).collect();
        let group_values: Vec<f64> = rows.iter().map(|&r| values[r]).collect();
        stats.segments.push(SegmentStats {
            label: Some(label),
            ..segment(&group_times, &group_values, clip)
        });
    }
    Ok(stats)
}

/// Statistics of the whole series as one segment.
pub fn full_stats(series: &TimeSeries, clip: ClipParams) -> Result<TelemetryStats, AveragingError> {
    let values = series.numeric()?;
    let mut stats = TelemetryStats::new(series.identifier(), series.unit().map(String::from));
    if !series.is_empty() {
        stats.segments.push(segment(series.timestamps(), values, clip));
    }
    Ok(stats)
}

/// Split `rows` (ascending times) into runs falling into the same `width`-wide
/// bin counted from `anchor`. Empty bins produce nothing. With `close_last`, a
/// last row exactly on a bin edge belongs to the bin before that edge.
fn bin_ranges(
    times: &[Epoch],
    rows: Range<usize>,
    anchor: Epoch,
    width: Duration,
    close_last: bool,
) -> Vec<Range<usize>> {
    if rows.is_empty() {
        return vec![];
    }
    let width_ns = width.total_nanoseconds();
    let offset = |i: usize| (times[i] - anchor).total_nanoseconds();
    let last_offset = offset(rows.end - 1);
    let mut last_bin = last_offset.div_euclid(width_ns);
    if close_last && last_bin > 0 && last_offset.rem_euclid(width_ns) == 0 {
        last_bin -= 1;
    }
    let bin_of = |i: usize| offset(i).div_euclid(width_ns).min(last_bin);

    let mut ranges = vec![];
    let mut start = rows.start;
    for i in rows.clone().skip(1) {
        if bin_of(i) != bin_of(start) {
            ranges.push(start..i);
            start = i;
        }
    }
    if start < rows.end {
        ranges.push(start..rows.end);
    }
    ranges
}

/// The statistics of parallel, non-empty times and values.
fn segment(times: &[Epoch], values: &[f64], clip: ClipParams) -> SegmentStats {
    let clipped = sigma_clipped_stats(values, clip.sigma, clip.max_iters);
    SegmentStats {
        time: median_time(times).unwrap_or(times[0]),
        mean: clipped.mean,
        median: clipped.median,
        stdev: clipped.stdev,
        max: clipped.max,
        min: clipped.min,
        label: None,
    }
}
