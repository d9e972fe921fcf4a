// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Condition filtering, segmentation and trending of spacecraft engineering
telemetry.

A [`TimeSeries`] of one mnemonic is filtered by [`Condition`]s built from
[`RelationTest`]s on dependency mnemonics, then summarised block-wise, daily,
per fixed interval or per dependency value by [`calculate_statistics`]. The
[`TelemetryMonitor`] drives all of this for a whole mnemonic file against an
archive and a statistics sink.
 */

pub mod averaging;
mod cli;
pub mod condition;
pub mod constants;
pub(crate) mod math;
pub mod monitor;
pub mod params;
pub mod time_series;
pub(crate) mod unit_parsing;

use crossbeam_utils::atomic::AtomicCell;

/// Should progress bars be drawn?
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

// Re-exports.
pub use averaging::{calculate_statistics, AveragingPolicy, ClipParams, SegmentStats, TelemetryStats};
pub use cli::{EdbTrending, TrendingError};
pub use condition::{
    Comparator, Condition, Criterion, Extraction, Interval, Intervals, RelationTest, Threshold,
};
pub use monitor::{
    query_windows, DependencyCache, DirectoryArchive, FetchError, JsonLinesSink, RunSummary,
    StatsSink, TelemetryArchive, TelemetryMonitor, TrendRecord,
};
pub use params::{AveragingKind, MnemonicConfig, MnemonicFile, TelemetryKind};
pub use time_series::{DuplicatePolicy, Samples, Sampling, TimeSeries, TimeWindow};
