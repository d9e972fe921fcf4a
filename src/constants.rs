// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Durations are kept as plain numbers here and converted into
[`hifitime::Duration`]s where they are used.
 */

/// Points further than this many standard deviations from the mean are
/// clipped when computing segment statistics.
pub const DEFAULT_CLIP_SIGMA: f64 = 3.0;

/// The maximum number of sigma-clipping passes over a segment.
pub const DEFAULT_MAX_CLIP_ITERS: u32 = 5;

/// When materialising a change-only series, the held value is inserted this
/// many nanoseconds before the next recorded value.
pub const CHANGE_ONLY_HOLD_OFFSET_NS: i64 = 1_000;

/// The archive is queried for this fraction of a day per window for
/// `daily_means` telemetry.
pub const DAILY_MEANS_QUERY_DAYS: f64 = 0.01;

/// The archive is queried for this many days per window for every other kind of
/// telemetry.
pub const DEFAULT_QUERY_DAYS: f64 = 1.0;

/// Consecutive query windows start this many days apart.
pub const QUERY_CADENCE_DAYS: f64 = 1.0;

/// Without any trending history, this many days before "now" are trended.
pub const DEFAULT_TRENDING_SPAN_DAYS: f64 = 14.0;

/// Daily-means windows are forced to start at this UTC hour.
pub const DAILY_MEANS_START_HOUR: f64 = 12.0;
