// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Destinations of trended statistics.

use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, ErrorKind, Write},
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use log::debug;
use serde::{Deserialize, Serialize};

use super::SinkError;
use crate::{
    averaging::TelemetryStats,
    params::TelemetryKind,
    time_series::{Samples, TimeSeries},
};

/// The results of trending one mnemonic over one or more queries.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRecord {
    /// The name the results are stored under.
    pub identifier: String,
    pub kind: TelemetryKind,

    /// The start of the last query that went into this record.
    pub latest_query: Epoch,

    pub stats: TelemetryStats,

    /// Every (filtered) sample, for kinds that keep them.
    pub samples: Option<TimeSeries>,
}

/// Something that stores trended statistics and remembers how far trending
/// has got.
pub trait StatsSink {
    /// The start of the latest query stored for `identifier`, if any.
    fn most_recent_search(&self, identifier: &str) -> Result<Option<Epoch>, SinkError>;

    fn store(&mut self, record: &TrendRecord) -> Result<(), SinkError>;
}

/// The stored form of a [`TrendRecord`]. Times are UTC MJDs; NaN statistics
/// are written as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub identifier: String,
    pub kind: String,
    pub latest_query: f64,
    pub unit: Option<String>,
    pub times: Vec<f64>,
    pub means: Vec<Option<f64>>,
    pub medians: Vec<Option<f64>>,
    pub stdevs: Vec<Option<f64>>,
    pub maxima: Vec<Option<f64>>,
    pub minima: Vec<Option<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_times: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Samples>,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

impl From<&TrendRecord> for StoredRecord {
    fn from(record: &TrendRecord) -> StoredRecord {
        let segments = &record.stats.segments;
        let column = |f: fn(&crate::averaging::SegmentStats) -> f64| {
            segments.iter().map(|s| finite(f(s))).collect::<Vec<_>>()
        };
        let labels = segments
            .iter()
            .map(|s| s.label.clone())
            .collect::<Option<Vec<_>>>()
            .filter(|l| !l.is_empty());
        StoredRecord {
            identifier: record.identifier.clone(),
            kind: record.kind.to_string(),
            latest_query: record.latest_query.to_mjd_utc_days(),
            unit: record.stats.unit.clone(),
            times: segments.iter().map(|s| s.time.to_mjd_utc_days()).collect(),
            means: column(|s| s.mean),
            medians: column(|s| s.median),
            stdevs: column(|s| s.stdev),
            maxima: column(|s| s.max),
            minima: column(|s| s.min),
            labels,
            sample_times: record
                .samples
                .as_ref()
                .map(|s| s.timestamps().iter().map(|t| t.to_mjd_utc_days()).collect()),
            sample_values: record.samples.as_ref().map(|s| s.values().clone()),
        }
    }
}

/// Only what's needed to resume trending.
#[derive(Deserialize)]
struct SearchEntry {
    identifier: String,
    latest_query: f64,
}

/// A file with one JSON [`StoredRecord`] per line. Records are only ever
/// appended.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    file: PathBuf,
}

impl JsonLinesSink {
    pub fn new<P: AsRef<Path>>(file: P) -> JsonLinesSink {
        JsonLinesSink {
            file: file.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Every record in the file.
    pub fn read_all(&self) -> Result<Vec<StoredRecord>, SinkError> {
        self.read_lines()
    }

    fn read_lines<T: for<'de> Deserialize<'de>>(&self) -> Result<Vec<T>, SinkError> {
        let file = match File::open(&self.file) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        let mut entries = vec![];
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|err| SinkError::BadRecord {
                file: self.file.clone(),
                line: i + 1,
                err,
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl StatsSink for JsonLinesSink {
    fn most_recent_search(&self, identifier: &str) -> Result<Option<Epoch>, SinkError> {
        let latest = self
            .read_lines::<SearchEntry>()?
            .into_iter()
            .filter(|e| e.identifier == identifier)
            .map(|e| e.latest_query)
            .fold(None, |acc: Option<f64>, q| Some(acc.map_or(q, |a| a.max(q))));
        Ok(latest.map(Epoch::from_mjd_utc))
    }

    fn store(&mut self, record: &TrendRecord) -> Result<(), SinkError> {
        let stored = StoredRecord::from(record);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;
        let mut line = serde_json::to_string(&stored)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        debug!(
            "Stored {} segments of {} in {}",
            stored.times.len(),
            stored.identifier,
            self.file.display()
        );
        Ok(())
    }
}
