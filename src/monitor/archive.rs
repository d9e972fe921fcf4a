// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sources of raw telemetry.

use std::{
    fs::File,
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::FetchError;
use crate::time_series::{DuplicatePolicy, Samples, Sampling, TimeSeries, TimeWindow};

/// Something that serves the raw samples of mnemonics.
pub trait TelemetryArchive {
    /// The samples of `mnemonic` inside `window`. The returned series' window
    /// is `window`. [`FetchError::NoData`] means the archive knows nothing of
    /// the mnemonic in this window; this is never fatal to a run.
    fn fetch(&self, mnemonic: &str, window: TimeWindow) -> Result<TimeSeries, FetchError>;
}

impl<T: TelemetryArchive + ?Sized> TelemetryArchive for &T {
    fn fetch(&self, mnemonic: &str, window: TimeWindow) -> Result<TimeSeries, FetchError> {
        (**self).fetch(mnemonic, window)
    }
}

/// The on-disk form of a mnemonic's telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveFile {
    pub sampling: Sampling,

    #[serde(default)]
    pub unit: Option<String>,

    /// UTC MJDs, ascending.
    pub times: Vec<f64>,

    pub values: Samples,
}

/// An archive of JSON files, one per mnemonic, named `<MNEMONIC>.json`. For
/// change-only mnemonics, the value in force at the start of a requested
/// window is returned as a sample at the start of the window.
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    dir: PathBuf,
}

impl DirectoryArchive {
    pub fn new<P: AsRef<Path>>(dir: P) -> DirectoryArchive {
        DirectoryArchive {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_of(&self, mnemonic: &str) -> PathBuf {
        self.dir.join(format!("{mnemonic}.json"))
    }

    fn read(&self, mnemonic: &str) -> Result<Option<TimeSeries>, FetchError> {
        let path = self.path_of(mnemonic);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        trace!("Reading {}", path.display());
        let contents: ArchiveFile =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| FetchError::Malformed {
                file: path.clone(),
                err: e.to_string(),
            })?;
        let times = contents.times.iter().map(|&mjd| Epoch::from_mjd_utc(mjd)).collect();
        let series = TimeSeries::new(mnemonic, times, contents.values, contents.sampling)?
            .with_unit(contents.unit);
        Ok(Some(series))
    }
}

impl TelemetryArchive for DirectoryArchive {
    fn fetch(&self, mnemonic: &str, window: TimeWindow) -> Result<TimeSeries, FetchError> {
        match self.read(mnemonic)? {
            Some(series) => {
                let mut subset = series.subset(window.start, window.end);
                // A change-only value recorded before the window still holds
                // at its start.
                if !series.is_dense() && subset.timestamps().first() != Some(&window.start) {
                    let held = series.interpolate(&[window.start]);
                    if !held.is_empty() {
                        trace!("{mnemonic}: holding the value in force at {}", window.start);
                        subset = held
                            .concat(&subset, DuplicatePolicy::KeepLast)?
                            .with_window(window);
                    }
                }
                debug!("{mnemonic}: {} samples between {window}", subset.len());
                Ok(subset)
            }
            None => Err(FetchError::NoData {
                mnemonic: mnemonic.to_string(),
                window,
            }),
        }
    }
}
