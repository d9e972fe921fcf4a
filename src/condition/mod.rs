// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conditions on telemetry.
//!
//! A [`RelationTest`] reduces a dependency series and a comparison (e.g.
//! "current > 0.2") to the time intervals over which the comparison holds. A
//! [`Condition`] ANDs any number of these (or other conditions) together and
//! extracts the samples of a target series that fall inside every one of them.
//!
//! Intervals are compared against timestamps, never against sample indices,
//! so the dependency and target series may be sampled at different times.

mod error;

pub use error::ConditionError;

use std::str::FromStr;

use hifitime::Epoch;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};
use vec1::Vec1;

use crate::time_series::{Samples, TimeSeries};

/// A comparison between a sample and a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, IntoStaticStr)]
pub enum Comparator {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

impl Comparator {
    fn holds<T: PartialOrd + ?Sized>(self, value: &T, threshold: &T) -> bool {
        match self {
            Comparator::Eq => value == threshold,
            Comparator::Ne => value != threshold,
            Comparator::Lt => value < threshold,
            Comparator::Le => value <= threshold,
            Comparator::Gt => value > threshold,
            Comparator::Ge => value >= threshold,
        }
    }
}

impl FromStr for Comparator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Comparator, ConditionError> {
        match s.trim() {
            "=" | "==" => Ok(Comparator::Eq),
            "!=" => Ok(Comparator::Ne),
            "<" => Ok(Comparator::Lt),
            "<=" => Ok(Comparator::Le),
            ">" => Ok(Comparator::Gt),
            ">=" => Ok(Comparator::Ge),
            _ => Err(ConditionError::AmbiguousRelation(s.to_string())),
        }
    }
}

/// The value a dependency is compared against. Its kind must match the kind of
/// the dependency's samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Numeric(f64),
    Text(String),
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Threshold::Numeric(n) => write!(f, "{n}"),
            Threshold::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Threshold {
    fn from(n: f64) -> Threshold {
        Threshold::Numeric(n)
    }
}

impl From<&str> for Threshold {
    fn from(s: &str) -> Threshold {
        Threshold::Text(s.to_string())
    }
}

/// A closed interval of time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub start: Epoch,
    pub end: Epoch,
}

impl Interval {
    pub fn contains(&self, time: Epoch) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Disjoint intervals in ascending order, or nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Intervals {
    /// The predicate never held.
    Empty,
    Some(Vec1<Interval>),
}

impl Intervals {
    /// `intervals` must be disjoint and ascending.
    fn from_vec(intervals: Vec<Interval>) -> Intervals {
        match Vec1::try_from_vec(intervals) {
            Ok(v) => Intervals::Some(v),
            Err(_) => Intervals::Empty,
        }
    }

    pub fn as_slice(&self) -> &[Interval] {
        match self {
            Intervals::Empty => &[],
            Intervals::Some(v) => v.as_slice(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Intervals::Empty)
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// The interval holding `time`, if any.
    pub fn interval_containing(&self, time: Epoch) -> Option<Interval> {
        let intervals = self.as_slice();
        let i = intervals.partition_point(|iv| iv.end < time);
        intervals.get(i).filter(|iv| iv.contains(time)).copied()
    }

    pub fn contains(&self, time: Epoch) -> bool {
        self.interval_containing(time).is_some()
    }

    /// The times covered by both sets of intervals.
    pub fn intersect(&self, other: &Intervals) -> Intervals {
        let (a, b) = (self.as_slice(), other.as_slice());
        let mut out = vec![];
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let start = a[i].start.max(b[j].start);
            let end = a[i].end.min(b[j].end);
            if start <= end {
                out.push(Interval { start, end });
            }
            if a[i].end < b[j].end {
                i += 1;
            } else {
                j += 1;
            }
        }
        Intervals::from_vec(out)
    }

    /// The start and end of every interval, in order.
    pub fn boundary_times(&self) -> Vec<Epoch> {
        self.as_slice()
            .iter()
            .flat_map(|iv| [iv.start, iv.end])
            .collect()
    }
}

/// The intervals over which a comparison on a dependency series holds.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationTest {
    dependency: String,
    comparator: Comparator,
    threshold: Threshold,
    time_pairs: Intervals,
}

impl RelationTest {
    /// Classify every sample of `series` as good (the comparison holds) or
    /// bad, and collapse each run of good samples into the interval from its
    /// first to its last timestamp.
    pub fn new(
        series: &TimeSeries,
        comparator: Comparator,
        threshold: Threshold,
    ) -> Result<RelationTest, ConditionError> {
        if series.is_empty() {
            return Err(ConditionError::EmptyInput(series.identifier().to_string()));
        }

        let good: Vec<bool> = match (series.values(), &threshold) {
            (Samples::Numeric(values), Threshold::Numeric(t)) => {
                values.iter().map(|v| comparator.holds(v, t)).collect()
            }
            (Samples::Text(values), Threshold::Text(t)) => values
                .iter()
                .map(|v| comparator.holds(v.as_str(), t.as_str()))
                .collect(),
            (values, _) => {
                return Err(ConditionError::ThresholdMismatch {
                    identifier: series.identifier().to_string(),
                    threshold: threshold.to_string(),
                    kind: values.kind(),
                })
            }
        };

        // Timestamps are non-decreasing, so the samples are already in time
        // order and a single pass finds every run.
        let mut intervals = vec![];
        let mut run: Option<Interval> = None;
        for (&time, good) in series.timestamps().iter().zip(good) {
            if good {
                match run.as_mut() {
                    Some(iv) => iv.end = time,
                    None => run = Some(Interval { start: time, end: time }),
                }
            } else if let Some(iv) = run.take() {
                intervals.push(iv);
            }
        }
        intervals.extend(run);

        let time_pairs = Intervals::from_vec(intervals);
        trace!(
            "{} {comparator} {threshold}: {} good intervals",
            series.identifier(),
            time_pairs.len()
        );
        Ok(RelationTest {
            dependency: series.identifier().to_string(),
            comparator,
            threshold,
            time_pairs,
        })
    }

    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }

    pub fn time_pairs(&self) -> &Intervals {
        &self.time_pairs
    }
}

/// A member of a [`Condition`].
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Relation(RelationTest),
    Condition(Condition),
}

impl Criterion {
    /// The intervals over which this criterion holds. `None` means it holds
    /// everywhere (a condition without any criteria).
    pub fn time_pairs(&self) -> Option<&Intervals> {
        match self {
            Criterion::Relation(r) => Some(r.time_pairs()),
            Criterion::Condition(c) => c.time_pairs(),
        }
    }
}

impl From<RelationTest> for Criterion {
    fn from(r: RelationTest) -> Criterion {
        Criterion::Relation(r)
    }
}

impl From<Condition> for Criterion {
    fn from(c: Condition) -> Criterion {
        Criterion::Condition(c)
    }
}

/// The result of [`Condition::extract_data`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The samples of the target inside every criterion's intervals. Its
    /// blocks are `block_indexes`.
    pub extracted_data: TimeSeries,

    /// The start of each contiguous run of good samples, as indices into
    /// `extracted_data`, followed by its length. Always at least two
    /// elements.
    pub block_indexes: Vec<usize>,
}

/// Criteria that must all hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    criteria: Vec<Criterion>,

    /// The intersection of all criteria's intervals.
    time_pairs: Option<Intervals>,
}

impl Condition {
    pub fn new(criteria: Vec<Criterion>) -> Condition {
        let time_pairs = criteria
            .iter()
            .filter_map(Criterion::time_pairs)
            .fold(None, |acc: Option<Intervals>, tp| match acc {
                None => Some(tp.clone()),
                Some(acc) => Some(acc.intersect(tp)),
            });
        Condition {
            criteria,
            time_pairs,
        }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// The intervals over which every criterion holds. `None` if there are no
    /// criteria.
    pub fn time_pairs(&self) -> Option<&Intervals> {
        self.time_pairs.as_ref()
    }

    /// Does every criterion hold at `time`?
    pub fn is_satisfied_at(&self, time: Epoch) -> bool {
        self.time_pairs.as_ref().map_or(true, |tp| tp.contains(time))
    }

    /// The interval over which every criterion holds that contains `time`.
    pub fn interval_containing(&self, time: Epoch) -> Option<Interval> {
        self.time_pairs.as_ref()?.interval_containing(time)
    }

    /// Keep the samples of `target` whose timestamps lie inside the intervals
    /// of every criterion, and note where each contiguous run of kept samples
    /// starts.
    pub fn extract_data(&self, target: &TimeSeries) -> Extraction {
        let empty = || Extraction {
            extracted_data: target.select_rows(&[], vec![0, 0]),
            block_indexes: vec![0, 0],
        };

        let mut mask = vec![true; target.len()];
        for criterion in &self.criteria {
            let time_pairs = match criterion.time_pairs() {
                Some(tp) => tp,
                None => continue,
            };
            if time_pairs.is_empty() {
                debug!(
                    "A criterion never holds; nothing of {} is kept",
                    target.identifier()
                );
                return empty();
            }
            for (good, &time) in mask.iter_mut().zip(target.timestamps()) {
                if *good {
                    *good = time_pairs.contains(time);
                }
            }
        }

        let mut rows = Vec::with_capacity(target.len());
        let mut block_indexes = vec![];
        let mut previous = false;
        for (i, good) in mask.into_iter().enumerate() {
            if good {
                if !previous {
                    block_indexes.push(rows.len());
                }
                rows.push(i);
            }
            previous = good;
        }
        if rows.is_empty() {
            return empty();
        }
        block_indexes.push(rows.len());
        debug!(
            "Kept {} of {} samples of {} in {} blocks",
            rows.len(),
            target.len(),
            target.identifier(),
            block_indexes.len() - 1
        );

        Extraction {
            extracted_data: target.select_rows(&rows, block_indexes.clone()),
            block_indexes,
        }
    }
}
