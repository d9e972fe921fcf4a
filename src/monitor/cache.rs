// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Previously-fetched dependency telemetry.

use indexmap::IndexMap;
use log::debug;

use crate::time_series::{DuplicatePolicy, TimeSeries, TimeSeriesError, TimeWindow};

/// A dependency's samples and the windows they were fetched for. The windows
/// are ascending; overlapping or touching ones are merged, so the samples are
/// complete inside each window and nothing is known between them.
#[derive(Debug)]
struct CachedSeries {
    series: TimeSeries,
    covered: Vec<TimeWindow>,
}

impl CachedSeries {
    fn add_window(&mut self, window: TimeWindow) {
        let i = self.covered.partition_point(|w| w.start < window.start);
        self.covered.insert(i, window);

        let mut merged: Vec<TimeWindow> = Vec::with_capacity(self.covered.len());
        for w in self.covered.drain(..) {
            match merged.last_mut() {
                Some(last) if w.start <= last.end => *last = last.union(&w),
                _ => merged.push(w),
            }
        }
        self.covered = merged;
    }
}

/// Dependency series fetched during a run, keyed by mnemonic name. Only the
/// [`super::TelemetryMonitor`] that owns the cache writes to it.
#[derive(Debug, Default)]
pub struct DependencyCache {
    series: IndexMap<String, CachedSeries>,
}

impl DependencyCache {
    pub fn new() -> DependencyCache {
        DependencyCache::default()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Everything cached for `mnemonic`.
    pub fn get(&self, mnemonic: &str) -> Option<&TimeSeries> {
        self.series.get(mnemonic).map(|c| &c.series)
    }

    /// The windows `mnemonic` has been fetched for, merged and ascending.
    pub fn covered(&self, mnemonic: &str) -> &[TimeWindow] {
        self.series
            .get(mnemonic)
            .map_or(&[], |c| c.covered.as_slice())
    }

    /// The cached samples of `mnemonic` inside `window`, if a single fetched
    /// window (after merging) covers all of it.
    pub fn lookup(&self, mnemonic: &str, window: TimeWindow) -> Option<TimeSeries> {
        let cached = self.series.get(mnemonic)?;
        if cached.covered.iter().any(|w| w.covers(&window)) {
            debug!("{mnemonic}: cached data covers {window}");
            Some(cached.series.subset(window.start, window.end))
        } else {
            debug!("{mnemonic}: cached data doesn't cover {window}");
            None
        }
    }

    /// Add samples fetched for `window`, merging them with anything already
    /// cached for the same mnemonic.
    pub fn insert(
        &mut self,
        mnemonic: &str,
        window: TimeWindow,
        series: TimeSeries,
        policy: DuplicatePolicy,
    ) -> Result<(), TimeSeriesError> {
        match self.series.get_mut(mnemonic) {
            Some(cached) => {
                cached.series = cached.series.concat(&series, policy)?;
                cached.add_window(window);
            }
            None => {
                self.series.insert(
                    mnemonic.to_string(),
                    CachedSeries {
                        series,
                        covered: vec![window],
                    },
                );
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }
}
