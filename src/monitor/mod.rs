// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Trending of mnemonics against an archive.
//!
//! For every mnemonic of a [`MnemonicFile`], the [`TelemetryMonitor`] works
//! out which days haven't been trended yet, fetches each day from the archive,
//! filters it by the mnemonic's dependencies, summarises it, and hands the
//! results of all days to the sink as a single [`TrendRecord`].

mod archive;
mod cache;
mod error;
mod sink;

pub use archive::{ArchiveFile, DirectoryArchive, TelemetryArchive};
pub use cache::DependencyCache;
pub use error::{FetchError, MonitorError, SinkError};
pub use sink::{JsonLinesSink, StatsSink, StoredRecord, TrendRecord};

use hifitime::{Duration, Epoch};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{debug, info, trace, warn};

use crate::{
    averaging::{calculate_statistics, ClipParams, TelemetryStats},
    condition::{Condition, Criterion, RelationTest},
    constants::{DAILY_MEANS_START_HOUR, DEFAULT_TRENDING_SPAN_DAYS, QUERY_CADENCE_DAYS},
    params::{
        AveragingKind, DependencyConfig, MnemonicConfig, MnemonicFile, ParamsError, PlotData,
        TelemetryKind,
    },
    time_series::{DuplicatePolicy, Sampling, TimeSeries, TimeWindow},
    PROGRESS_BARS,
};

/// Windows to query the archive with, so that `[start, end]` is covered one
/// day at a time. Windows are `duration` long and start every query cadence
/// from `start`. Nothing is queried if the span isn't longer than `duration`;
/// the next run picks it up. A final partial day is only queried if what's
/// left of it is longer than `duration`. Windows that would end after `now`
/// are dropped.
pub fn query_windows(start: Epoch, end: Epoch, duration: Duration, now: Epoch) -> Vec<TimeWindow> {
    let span = end - start;
    if span <= duration {
        return vec![];
    }
    let cadence = Duration::from_days(QUERY_CADENCE_DAYS);
    let cadence_ns = cadence.total_nanoseconds();
    let span_ns = span.total_nanoseconds();
    let mut num_windows = span_ns / cadence_ns;
    if span_ns % cadence_ns > duration.total_nanoseconds() {
        num_windows += 1;
    }

    (0..num_windows)
        .map(|i| {
            let start = start + Duration::from_total_nanoseconds(i * cadence_ns);
            TimeWindow::new(start, start + duration)
        })
        .filter(|w| w.end <= now)
        .collect()
}

/// Noon UTC on the day of `epoch`.
fn noon_of(epoch: Epoch) -> Epoch {
    let (y, m, d, ..) = epoch.to_gregorian_utc();
    Epoch::from_gregorian_utc_at_midnight(y, m, d) + Duration::from_hours(DAILY_MEANS_START_HOUR)
}

/// A mnemonic's telemetry for one query, ready to be summarised.
#[derive(Debug, Clone)]
pub struct PreparedTelemetry {
    pub series: TimeSeries,

    /// For every-change telemetry, the dependency whose values define the
    /// segments.
    pub changes: Option<TimeSeries>,
}

/// What happened during [`TelemetryMonitor::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Identifiers with newly-stored results.
    pub stored: Vec<String>,

    /// Identifiers that didn't need any new queries.
    pub up_to_date: Vec<String>,

    /// Identifiers that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

pub struct TelemetryMonitor<A, S> {
    archive: A,
    sink: S,
    cache: DependencyCache,
    clip: ClipParams,
    now: Epoch,
    remove_outer_points: bool,
    duplicate_policy: DuplicatePolicy,
}

impl<A: TelemetryArchive, S: StatsSink> TelemetryMonitor<A, S> {
    /// `now` is the latest time that may be queried.
    pub fn new(archive: A, sink: S, cache: DependencyCache, now: Epoch) -> TelemetryMonitor<A, S> {
        TelemetryMonitor {
            archive,
            sink,
            cache,
            clip: ClipParams::default(),
            now,
            remove_outer_points: false,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_clip(mut self, clip: ClipParams) -> Self {
        self.clip = clip;
        self
    }

    /// Drop the first and last samples of everything fetched, for archives
    /// that return a sample beyond each end of the requested window.
    pub fn with_remove_outer_points(mut self, remove: bool) -> Self {
        self.remove_outer_points = remove;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn cache(&self) -> &DependencyCache {
        &self.cache
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (A, S, DependencyCache) {
        (self.archive, self.sink, self.cache)
    }

    /// Fetch `mnemonic`. No data is an empty series.
    fn fetch(&self, mnemonic: &str, window: TimeWindow) -> Result<TimeSeries, MonitorError> {
        let series = match self.archive.fetch(mnemonic, window) {
            Ok(s) => s.with_window(window),
            Err(FetchError::NoData { .. }) => {
                info!("No data for {mnemonic} between {window}");
                return Ok(TimeSeries::empty(mnemonic, Sampling::AllPoints).with_window(window));
            }
            Err(e) => return Err(e.into()),
        };
        if self.remove_outer_points && series.len() >= 3 {
            Ok(series.remove_outer_points())
        } else {
            Ok(series)
        }
    }

    /// The telemetry of a dependency, from the cache if it covers `window`,
    /// otherwise from the archive (and then cached).
    pub fn get_dependency_data(
        &mut self,
        mnemonic: &str,
        window: TimeWindow,
    ) -> Result<TimeSeries, MonitorError> {
        if let Some(series) = self.cache.lookup(mnemonic, window) {
            return Ok(series);
        }
        debug!("Fetching dependency {mnemonic} for {window}");
        let series = self.fetch(mnemonic, window)?;
        self.cache
            .insert(mnemonic, window, series.clone(), self.duplicate_policy)?;
        Ok(series)
    }

    /// Keep only the samples of `data` taken while every dependency held. A
    /// dependency on `mnemonic` itself uses `data`. If any dependency has no
    /// data, nothing is kept. A change-only `data` is first step-held onto
    /// its own timestamps plus the start and end of every interval the
    /// dependencies hold for, so that a steady value isn't lost for lack of
    /// samples inside those intervals.
    pub fn filter_telemetry(
        &mut self,
        mnemonic: &str,
        data: &TimeSeries,
        dependencies: &[DependencyConfig],
    ) -> Result<TimeSeries, MonitorError> {
        if dependencies.is_empty() {
            return Ok(data.clone());
        }
        let window = match data.window() {
            Some(w) => w,
            None => return Ok(data.clone()),
        };

        let mut relations = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            let dep_data = if dep.name == mnemonic {
                data.clone()
            } else {
                self.get_dependency_data(&dep.name, window)?
            };
            if dep_data.is_empty() {
                info!(
                    "No data for dependency {} between {window}, so ignoring {mnemonic} data for the same time",
                    dep.name
                );
                return Ok(TimeSeries::empty(data.identifier(), data.sampling())
                    .with_unit(data.unit())
                    .with_window(window));
            }
            let relation = RelationTest::new(&dep_data, dep.comparator()?, dep.threshold.clone())?;
            relations.push(relation);
        }

        let target = if data.is_dense() {
            data.clone()
        } else {
            let boundaries = relations
                .iter()
                .map(|r| r.time_pairs())
                .filter(|tp| !tp.is_empty())
                .flat_map(|tp| tp.boundary_times());
            let dates = data
                .timestamps()
                .iter()
                .copied()
                .chain(boundaries)
                .sorted()
                .dedup()
                .collect::<Vec<_>>();
            trace!(
                "{mnemonic}: holding {} change-only samples onto {} times",
                data.len(),
                dates.len()
            );
            data.interpolate(&dates)
        };

        let condition = Condition::new(relations.into_iter().map(Criterion::from).collect());
        let extraction = condition.extract_data(&target);
        debug!(
            "{mnemonic}: {} of {} samples pass the dependencies",
            extraction.extracted_data.len(),
            target.len()
        );
        Ok(extraction.extracted_data)
    }

    /// Get the dependency whose values segment every-change telemetry. Only a
    /// single dependency is supported. `None` if either the telemetry or the
    /// dependency has no data.
    pub fn find_all_changes(
        &mut self,
        data: &TimeSeries,
        dependencies: &[DependencyConfig],
    ) -> Result<Option<TimeSeries>, MonitorError> {
        let dep = match dependencies {
            [dep] => dep,
            _ => {
                return Err(MonitorError::Unsupported {
                    mnemonic: data.identifier().to_string(),
                    reason: format!(
                        "every_change telemetry needs exactly one dependency, not {}",
                        dependencies.len()
                    ),
                })
            }
        };
        let window = match data.window() {
            Some(w) if !data.is_empty() => w,
            _ => return Ok(None),
        };
        let changes = self.get_dependency_data(&dep.name, window)?;
        if changes.is_empty() {
            info!(
                "No data for dependency {} between {window}; no every-change statistics for {}",
                dep.name,
                data.identifier()
            );
            return Ok(None);
        }
        Ok(Some(changes))
    }

    /// Fetch and filter one mnemonic for one query. `None` if nothing is left.
    pub fn mnemonic_info(
        &mut self,
        config: &MnemonicConfig,
        kind: TelemetryKind,
        window: TimeWindow,
    ) -> Result<Option<PreparedTelemetry>, MonitorError> {
        info!("Querying the archive for {} between {window}", config.name);
        let raw = self.fetch(&config.name, window)?;
        if raw.is_empty() {
            return Ok(None);
        }
        debug!("{}: {} samples", config.name, raw.len());
        let raw = raw.with_identifier(config.identifier());

        let every_change = kind.averaging == AveragingKind::EveryChange;
        let series = if !config.dependency.is_empty() && !every_change {
            self.filter_telemetry(&config.name, &raw, &config.dependency)?
        } else {
            raw
        };
        let changes = if every_change {
            match self.find_all_changes(&series, &config.dependency)? {
                Some(c) => Some(c),
                None => return Ok(None),
            }
        } else {
            None
        };

        if series.is_empty() {
            info!("{}: nothing left after filtering", config.name);
            return Ok(None);
        }
        Ok(Some(PreparedTelemetry { series, changes }))
    }

    /// Trend a mnemonic over several queries, summarising each query on its
    /// own and concatenating the results. Queries without data are skipped.
    pub fn multiday_mnemonic_query(
        &mut self,
        config: &MnemonicConfig,
        kind: TelemetryKind,
        windows: &[TimeWindow],
    ) -> Result<TrendRecord, MonitorError> {
        let policy = config.averaging_policy(kind)?;
        let plot_data = config.plot_data()?;
        if kind.averaging == AveragingKind::EveryChange {
            if let PlotData::Product(_) = plot_data {
                return Err(ParamsError::ProductEveryChange(config.name.clone()).into());
            }
        }
        let identifier = config.product_identifier()?;

        let mut stats = TelemetryStats::new(&identifier, None);
        let mut samples: Option<TimeSeries> = None;
        for &window in windows {
            let prepared = match self.mnemonic_info(config, kind, window)? {
                Some(p) => p,
                None => {
                    info!("{} has no data between {window}", config.name);
                    continue;
                }
            };

            let series = match &plot_data {
                PlotData::Nominal => prepared.series,
                PlotData::Product(other) => {
                    let other_config = MnemonicConfig {
                        name: other.clone(),
                        database_id: None,
                        ..config.clone()
                    };
                    match self.mnemonic_info(&other_config, kind, window)? {
                        Some(p) => prepared.series.multiply(&p.series)?.with_identifier(&identifier),
                        None => {
                            info!("{other} to use as product has no data between {window}");
                            continue;
                        }
                    }
                }
            };

            let window_stats =
                calculate_statistics(&series, policy, prepared.changes.as_ref(), self.clip)?;
            stats.extend(window_stats);
            if kind.keep_samples {
                samples = Some(match samples {
                    Some(s) => s.concat(&series, self.duplicate_policy)?,
                    None => series,
                });
            }
        }

        // The next run carries on one cadence after the start of the last query.
        let latest_query = windows.last().map_or(self.now, |w| w.start);
        info!(
            "Done with {identifier}: {} segments up to {latest_query}",
            stats.len()
        );
        Ok(TrendRecord {
            identifier,
            kind,
            latest_query,
            stats,
            samples,
        })
    }

    /// Where trending of `identifier` starts: `start` if given, otherwise one
    /// query cadence after the start of the previous run's last query (at noon
    /// for daily means), otherwise the default span before now.
    pub fn start_time(
        &self,
        identifier: &str,
        kind: TelemetryKind,
        start: Option<Epoch>,
    ) -> Result<Epoch, MonitorError> {
        if let Some(start) = start {
            return Ok(start);
        }
        if kind.has_history() {
            if let Some(previous) = self.sink.most_recent_search(identifier)? {
                debug!("{identifier}: the previous query started at {previous}");
                let previous = if kind.averaging == AveragingKind::DailyMeans {
                    noon_of(previous)
                } else {
                    previous
                };
                return Ok(previous + Duration::from_days(QUERY_CADENCE_DAYS));
            }
            debug!("{identifier}: no query history");
        }
        Ok(self.now - Duration::from_days(DEFAULT_TRENDING_SPAN_DAYS))
    }

    /// Trend every mnemonic in `mnemonics` up to `end` (default now). A
    /// mnemonic that fails is reported in the summary; only archive service
    /// or sink failures stop the run.
    pub fn run(
        &mut self,
        mnemonics: &MnemonicFile,
        start: Option<Epoch>,
        end: Option<Epoch>,
    ) -> Result<RunSummary, MonitorError> {
        let end = end.unwrap_or(self.now);
        let mut summary = RunSummary::default();

        let pb = ProgressBar::new(mnemonics.len() as _)
            .with_style(
                ProgressStyle::default_bar()
                    .template("{msg:17}: [{wide_bar:.blue}] {pos:3}/{len:3} ({elapsed_precise}<{eta_precise})")
                    .unwrap()
                    .progress_chars("=> "),
            )
            .with_position(0)
            .with_message("Trending");
        pb.set_draw_target(if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        });

        for (kind, config) in mnemonics.iter() {
            pb.inc(1);
            let identifier = config.product_identifier()?;
            info!("Working on {identifier} ({kind})");

            let result = self.start_time(&identifier, kind, start).and_then(|start| {
                let windows = query_windows(start, end, kind.query_duration(), self.now);
                trace!(
                    "{identifier}: query windows: {}",
                    windows.iter().map(|w| w.start).join(", ")
                );
                if windows.is_empty() {
                    Ok(None)
                } else {
                    self.multiday_mnemonic_query(config, kind, &windows).map(Some)
                }
            });

            match result {
                Ok(Some(record)) => {
                    self.sink.store(&record)?;
                    summary.stored.push(identifier);
                }
                Ok(None) => {
                    info!("{identifier}: nothing new to query");
                    summary.up_to_date.push(identifier);
                }
                Err(e) if e.is_fatal() => {
                    pb.abandon_with_message("Failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!("{identifier}: {e}");
                    summary.failed.push((identifier, e.to_string()));
                }
            }
        }
        pb.finish_with_message("Done");

        Ok(summary)
    }
}
