// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Telemetry time series and the operators that combine them.
//!
//! A [`TimeSeries`] holds the readings of one mnemonic. Readings are either
//! numbers or text, and the series is either sampled at every point or only
//! when the value changes ("change-only"). Operators never mutate their inputs;
//! they return new series.

mod error;

pub use error::TimeSeriesError;

use hifitime::{Duration, Epoch};
use itertools::Itertools;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::constants::CHANGE_ONLY_HOLD_OFFSET_NS;

/// The readings of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Samples {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Numeric(v) => v.len(),
            Samples::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Samples::Numeric(_) => "numeric",
            Samples::Text(_) => "text",
        }
    }

    /// Empty samples count as either kind.
    fn same_kind(&self, other: &Samples) -> bool {
        self.is_empty()
            || other.is_empty()
            || matches!(
                (self, other),
                (Samples::Numeric(_), Samples::Numeric(_)) | (Samples::Text(_), Samples::Text(_))
            )
    }

    fn with_capacity_like(&self, capacity: usize) -> Samples {
        match self {
            Samples::Numeric(_) => Samples::Numeric(Vec::with_capacity(capacity)),
            Samples::Text(_) => Samples::Text(Vec::with_capacity(capacity)),
        }
    }

    /// Append the value at `index` of `other`. Both must be the same kind.
    fn push_from(&mut self, other: &Samples, index: usize) {
        match (self, other) {
            (Samples::Numeric(dst), Samples::Numeric(src)) => dst.push(src[index]),
            (Samples::Text(dst), Samples::Text(src)) => dst.push(src[index].clone()),
            // An empty buffer adopts the kind of whatever is pushed into it.
            (dst, src) if dst.is_empty() => {
                *dst = src.with_capacity_like(1);
                dst.push_from(src, index);
            }
            _ => unreachable!("sample kinds are checked before merging"),
        }
    }

    fn same_value(&self, i: usize, other: &Samples, j: usize) -> bool {
        match (self, other) {
            (Samples::Numeric(a), Samples::Numeric(b)) => a[i] == b[j],
            (Samples::Text(a), Samples::Text(b)) => a[i] == b[j],
            _ => false,
        }
    }

    pub(crate) fn gather<I: IntoIterator<Item = usize>>(&self, indices: I) -> Samples {
        match self {
            Samples::Numeric(v) => Samples::Numeric(indices.into_iter().map(|i| v[i]).collect()),
            Samples::Text(v) => {
                Samples::Text(indices.into_iter().map(|i| v[i].clone()).collect())
            }
        }
    }

    /// A printable form of a single value.
    pub(crate) fn label(&self, index: usize) -> String {
        match self {
            Samples::Numeric(v) => v[index].to_string(),
            Samples::Text(v) => v[index].clone(),
        }
    }
}

/// How a mnemonic is recorded by the archive.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    /// Every sample is recorded.
    #[strum(serialize = "all_points")]
    AllPoints,

    /// A sample is recorded only when the value changes; a value persists until
    /// the next recorded sample.
    #[strum(serialize = "change_only")]
    ChangeOnly,
}

/// The span of time a series was requested for. This is generally wider than
/// the span covered by its samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: Epoch,
    pub end: Epoch,
}

impl TimeWindow {
    pub fn new(start: Epoch, end: Epoch) -> TimeWindow {
        TimeWindow { start, end }
    }

    pub fn covers(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    pub fn union(&self, other: &TimeWindow) -> TimeWindow {
        TimeWindow {
            start: if other.start < self.start {
                other.start
            } else {
                self.start
            },
            end: if other.end > self.end {
                other.end
            } else {
                self.end
            },
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// What to do when two series being concatenated hold different values at the
/// same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the value of the series on the left. A warning is logged.
    #[default]
    KeepFirst,

    /// Keep the value of the series on the right. A warning is logged.
    KeepLast,

    /// Fail.
    Error,
}

/// Requested timestamps that could not be given a value because they precede
/// the first sample of the series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpolationReport {
    pub dropped: Vec<Epoch>,
}

/// The readings of one mnemonic.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    identifier: String,
    timestamps: Vec<Epoch>,
    values: Samples,
    sampling: Sampling,
    unit: Option<String>,

    /// Indices of the first sample of each contiguous segment, followed by the
    /// series length.
    blocks: Vec<usize>,

    window: Option<TimeWindow>,
}

impl TimeSeries {
    /// Create a new series. The timestamps must be non-decreasing and there
    /// must be as many of them as there are values. The whole series is a
    /// single block.
    pub fn new<S: Into<String>>(
        identifier: S,
        timestamps: Vec<Epoch>,
        values: Samples,
        sampling: Sampling,
    ) -> Result<TimeSeries, TimeSeriesError> {
        let identifier = identifier.into();
        if timestamps.len() != values.len() {
            return Err(TimeSeriesError::LengthMismatch {
                identifier,
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        if let Some((index, (_, &time))) = timestamps
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| b < a)
        {
            return Err(TimeSeriesError::Unsorted {
                identifier,
                index: index + 1,
                time,
            });
        }

        let len = timestamps.len();
        Ok(TimeSeries {
            identifier,
            timestamps,
            values,
            sampling,
            unit: None,
            blocks: vec![0, len],
            window: None,
        })
    }

    /// A series without any samples.
    pub fn empty<S: Into<String>>(identifier: S, sampling: Sampling) -> TimeSeries {
        TimeSeries {
            identifier: identifier.into(),
            timestamps: vec![],
            values: Samples::Numeric(vec![]),
            sampling,
            unit: None,
            blocks: vec![0, 0],
            window: None,
        }
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: Option<S>) -> TimeSeries {
        self.unit = unit.map(Into::into);
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> TimeSeries {
        self.window = Some(window);
        self
    }

    pub fn with_identifier<S: Into<String>>(mut self, identifier: S) -> TimeSeries {
        self.identifier = identifier.into();
        self
    }

    /// Set the block boundaries. A missing leading 0 or trailing length is
    /// added; otherwise the boundaries must be strictly increasing.
    pub fn with_blocks(mut self, mut blocks: Vec<usize>) -> Result<TimeSeries, TimeSeriesError> {
        let len = self.len();
        if len == 0 && blocks.iter().all(|&b| b == 0) {
            self.blocks = vec![0, 0];
            return Ok(self);
        }
        if blocks.first() != Some(&0) {
            blocks.insert(0, 0);
        }
        if blocks.last() != Some(&len) {
            blocks.push(len);
        }
        if !blocks.iter().tuple_windows().all(|(a, b)| a < b) {
            return Err(TimeSeriesError::InvalidBlocks {
                identifier: self.identifier,
                blocks,
                len,
            });
        }
        self.blocks = blocks;
        Ok(self)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn timestamps(&self) -> &[Epoch] {
        &self.timestamps
    }

    pub fn values(&self) -> &Samples {
        &self.values
    }

    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    pub fn is_dense(&self) -> bool {
        self.sampling == Sampling::AllPoints
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn blocks(&self) -> &[usize] {
        &self.blocks
    }

    /// The index ranges of each block.
    pub fn block_ranges(&self) -> impl Iterator<Item = std::ops::Range<usize>> + '_ {
        self.blocks.iter().tuple_windows().map(|(&a, &b)| a..b)
    }

    /// The requested window of this series, or if there isn't one, the span
    /// of its samples.
    pub fn window(&self) -> Option<TimeWindow> {
        self.window.or_else(|| match (self.timestamps.first(), self.timestamps.last()) {
            (Some(&start), Some(&end)) => Some(TimeWindow { start, end }),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn numeric(&self) -> Result<&[f64], TimeSeriesError> {
        match &self.values {
            Samples::Numeric(v) => Ok(v),
            Samples::Text(v) if v.is_empty() => Ok(&[]),
            Samples::Text(_) => Err(TimeSeriesError::NotNumeric(self.identifier.clone())),
        }
    }

    /// A new series from the given rows of this one. `rows` must be ascending.
    /// `blocks` must satisfy the block invariants for `rows.len()` samples.
    pub(crate) fn select_rows(&self, rows: &[usize], blocks: Vec<usize>) -> TimeSeries {
        debug_assert_eq!(blocks.last(), Some(&rows.len()));
        TimeSeries {
            identifier: self.identifier.clone(),
            timestamps: rows.iter().map(|&i| self.timestamps[i]).collect(),
            values: self.values.gather(rows.iter().copied()),
            sampling: self.sampling,
            unit: self.unit.clone(),
            blocks,
            window: self.window,
        }
    }

    /// The samples with timestamps in `[start, end]`, as a single block. The
    /// window of the new series is the requested one.
    pub fn subset(&self, start: Epoch, end: Epoch) -> TimeSeries {
        let first = self.timestamps.partition_point(|t| *t < start);
        let last = self.timestamps.partition_point(|t| *t <= end);
        let rows = (first..last.max(first)).collect::<Vec<_>>();
        let n = rows.len();
        self.select_rows(&rows, vec![0, n])
            .with_window(TimeWindow { start, end })
    }

    /// Drop the first and last samples. The archive returns one sample on each
    /// side of the requested window; these fall outside of it.
    pub fn remove_outer_points(&self) -> TimeSeries {
        if self.len() < 3 {
            trace!(
                "{}: only {} samples; nothing remains after removing the outer points",
                self.identifier,
                self.len()
            );
            return self.select_rows(&[], vec![0, 0]);
        }
        let rows = (1..self.len() - 1).collect::<Vec<_>>();
        let new_times = &self.timestamps[1..self.len() - 1];
        let blocks = self.remap_blocks(new_times);
        self.select_rows(&rows, blocks)
    }

    /// Map this series' block boundaries onto a new timeline. Each interior
    /// boundary moves to the first new timestamp at or after the boundary's
    /// time.
    fn remap_blocks(&self, new_times: &[Epoch]) -> Vec<usize> {
        let len = new_times.len();
        if len == 0 {
            return vec![0, 0];
        }
        let mut blocks = vec![0];
        let interior = &self.blocks[1..self.blocks.len() - 1];
        for &b in interior {
            let boundary_time = self.timestamps[b];
            let new_index = new_times.partition_point(|t| *t < boundary_time);
            if new_index > blocks[blocks.len() - 1] && new_index < len {
                blocks.push(new_index);
            }
        }
        blocks.push(len);
        blocks
    }

    /// Combine this series with another covering an adjacent or overlapping
    /// window. Samples recorded at the same time with the same value are kept
    /// once; if the values differ, `policy` decides. The result is a single
    /// block and its window is the union of both windows.
    pub fn concat(
        &self,
        other: &TimeSeries,
        policy: DuplicatePolicy,
    ) -> Result<TimeSeries, TimeSeriesError> {
        if !self.values.same_kind(&other.values) {
            return Err(TimeSeriesError::MismatchedKinds {
                left: format!("{} ({})", self.identifier, self.values.kind()),
                right: format!("{} ({})", other.identifier, other.values.kind()),
            });
        }

        let capacity = self.len() + other.len();
        let mut timestamps = Vec::with_capacity(capacity);
        let mut values = if self.values.is_empty() {
            other.values.with_capacity_like(capacity)
        } else {
            self.values.with_capacity_like(capacity)
        };
        let mut num_duplicates = 0;
        let (mut i, mut j) = (0, 0);
        while i < self.len() || j < other.len() {
            let take_self = match (self.timestamps.get(i), other.timestamps.get(j)) {
                (Some(a), Some(b)) if a == b => {
                    num_duplicates += 1;
                    let keep_self = if self.values.same_value(i, &other.values, j) {
                        true
                    } else {
                        match policy {
                            DuplicatePolicy::Error => {
                                return Err(TimeSeriesError::DuplicateConflict {
                                    identifier: self.identifier.clone(),
                                    time: *a,
                                })
                            }
                            DuplicatePolicy::KeepFirst => {
                                warn!(
                                    "{}: conflicting values {} and {} at {a}; keeping {}",
                                    self.identifier,
                                    self.values.label(i),
                                    other.values.label(j),
                                    self.values.label(i)
                                );
                                true
                            }
                            DuplicatePolicy::KeepLast => {
                                warn!(
                                    "{}: conflicting values {} and {} at {a}; keeping {}",
                                    self.identifier,
                                    self.values.label(i),
                                    other.values.label(j),
                                    other.values.label(j)
                                );
                                false
                            }
                        }
                    };
                    timestamps.push(*a);
                    if keep_self {
                        values.push_from(&self.values, i);
                    } else {
                        values.push_from(&other.values, j);
                    }
                    i += 1;
                    j += 1;
                    continue;
                }
                (Some(a), Some(b)) => a < b,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if take_self {
                timestamps.push(self.timestamps[i]);
                values.push_from(&self.values, i);
                i += 1;
            } else {
                timestamps.push(other.timestamps[j]);
                values.push_from(&other.values, j);
                j += 1;
            }
        }
        if num_duplicates > 0 {
            debug!(
                "{}: dropped {num_duplicates} duplicate timestamps while concatenating",
                self.identifier
            );
        }

        let window = match (self.window(), other.window()) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
        let len = timestamps.len();
        Ok(TimeSeries {
            identifier: self.identifier.clone(),
            timestamps,
            values,
            sampling: self.sampling,
            unit: self.unit.clone().or_else(|| other.unit.clone()),
            blocks: vec![0, len],
            window,
        })
    }

    /// Step-hold this series onto new timestamps: each requested time takes
    /// the value of the latest sample at or before it. Requested times before
    /// the first sample are dropped from the output and logged. Block
    /// boundaries are carried over to the new timeline.
    pub fn interpolate(&self, times: &[Epoch]) -> TimeSeries {
        self.interpolate_with_report(times).0
    }

    /// As [`TimeSeries::interpolate`], also returning the dropped times.
    pub fn interpolate_with_report(&self, times: &[Epoch]) -> (TimeSeries, InterpolationReport) {
        let mut requested = times.to_vec();
        requested.sort();

        let mut report = InterpolationReport::default();
        let mut new_times = Vec::with_capacity(requested.len());
        let mut source_rows = Vec::with_capacity(requested.len());
        for t in requested {
            match self.timestamps.partition_point(|x| *x <= t) {
                0 => report.dropped.push(t),
                n => {
                    new_times.push(t);
                    source_rows.push(n - 1);
                }
            }
        }
        if !report.dropped.is_empty() {
            debug!(
                "{}: {} requested interpolation times precede the first sample and were dropped",
                self.identifier,
                report.dropped.len()
            );
        }

        let blocks = self.remap_blocks(&new_times);
        let series = TimeSeries {
            identifier: self.identifier.clone(),
            values: self.values.gather(source_rows),
            timestamps: new_times,
            sampling: self.sampling,
            unit: self.unit.clone(),
            blocks,
            window: self.window,
        };
        (series, report)
    }

    /// Materialise the implicit samples of a change-only series. Before each
    /// recorded sample (except the first), a sample holding the previous value
    /// is inserted just before it. The result is an all-points series; an
    /// all-points series is returned unchanged.
    pub fn change_only_add_points(&self) -> TimeSeries {
        if self.is_dense() || self.is_empty() {
            return self.clone();
        }

        let offset = Duration::from_total_nanoseconds(i128::from(CHANGE_ONLY_HOLD_OFFSET_NS));
        let mut timestamps = Vec::with_capacity(2 * self.len());
        let mut source_rows = Vec::with_capacity(2 * self.len());
        // Where each original sample lands in the new series.
        let mut new_positions = Vec::with_capacity(self.len());
        for (i, &t) in self.timestamps.iter().enumerate() {
            if i > 0 {
                let held = t - offset;
                if held > self.timestamps[i - 1] {
                    timestamps.push(held);
                    source_rows.push(i - 1);
                }
            }
            new_positions.push(timestamps.len());
            timestamps.push(t);
            source_rows.push(i);
        }

        let len = timestamps.len();
        let mut blocks = self.blocks[..self.blocks.len() - 1]
            .iter()
            .map(|&b| new_positions[b])
            .collect::<Vec<_>>();
        blocks.push(len);
        blocks.dedup();

        TimeSeries {
            identifier: self.identifier.clone(),
            timestamps,
            values: self.values.gather(source_rows),
            sampling: Sampling::AllPoints,
            unit: self.unit.clone(),
            blocks,
            window: self.window,
        }
    }

    /// Multiply two numeric series, e.g. a voltage and a current into a power.
    /// Both are step-held onto a common timeline: a change-only operand is
    /// held onto the all-points operand's timestamps; two all-points operands
    /// use the denser timeline; two change-only operands use the union of both
    /// timelines. Times before either operand's first sample are not kept.
    ///
    /// The result is named `"<self>*<other>"` and keeps this series' blocks.
    pub fn multiply(&self, other: &TimeSeries) -> Result<TimeSeries, TimeSeriesError> {
        let a = self.numeric()?;
        let b = other.numeric()?;
        let identifier = format!("{}*{}", self.identifier, other.identifier);
        let unit = multiply_units(self.unit(), other.unit());
        let sampling = match (self.sampling, other.sampling) {
            (Sampling::ChangeOnly, Sampling::ChangeOnly) => Sampling::ChangeOnly,
            _ => Sampling::AllPoints,
        };
        if a.is_empty() || b.is_empty() {
            return Ok(TimeSeries::empty(identifier, sampling).with_unit(unit));
        }

        let grid: Vec<Epoch> = match (self.sampling, other.sampling) {
            (Sampling::AllPoints, Sampling::ChangeOnly) => self.timestamps.clone(),
            (Sampling::ChangeOnly, Sampling::AllPoints) => other.timestamps.clone(),
            (Sampling::AllPoints, Sampling::AllPoints) => {
                if other.len() > self.len() {
                    other.timestamps.clone()
                } else {
                    self.timestamps.clone()
                }
            }
            (Sampling::ChangeOnly, Sampling::ChangeOnly) => self
                .timestamps
                .iter()
                .merge(other.timestamps.iter())
                .dedup()
                .copied()
                .collect(),
        };
        let earliest = if self.timestamps[0] > other.timestamps[0] {
            self.timestamps[0]
        } else {
            other.timestamps[0]
        };
        let grid = grid.into_iter().filter(|t| *t >= earliest).collect::<Vec<_>>();

        let left = self.interpolate(&grid);
        let right = other.interpolate(&grid);
        let products = left
            .numeric()?
            .iter()
            .zip(right.numeric()?)
            .map(|(x, y)| x * y)
            .collect::<Vec<_>>();
        trace!("{identifier}: multiplied {} aligned samples", products.len());

        Ok(TimeSeries {
            identifier,
            timestamps: left.timestamps,
            values: Samples::Numeric(products),
            sampling,
            unit,
            blocks: left.blocks,
            window: self.window,
        })
    }
}

/// Known unit products. Anything else is joined with `*`.
const UNIT_PRODUCTS: &[(&str, &str, &str)] = &[("V", "A", "W"), ("A", "V", "W")];

fn multiply_units(a: Option<&str>, b: Option<&str>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(
            UNIT_PRODUCTS
                .iter()
                .find(|(x, y, _)| *x == a && *y == b)
                .map(|(_, _, p)| p.to_string())
                .unwrap_or_else(|| format!("{a}*{b}")),
        ),
        (a, b) => a.or(b).map(str::to_string),
    }
}
