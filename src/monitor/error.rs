// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    averaging::AveragingError, condition::ConditionError, params::ParamsError,
    time_series::{TimeSeriesError, TimeWindow},
};

/// Errors from a [`super::TelemetryArchive`].
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("The archive has no data for {mnemonic} between {window}")]
    NoData { mnemonic: String, window: TimeWindow },

    #[error("The archive refused the credentials: {0}")]
    Authentication(String),

    #[error("The archive service failed: {0}")]
    Service(String),

    #[error("Couldn't decode archive file {file}: {err}")]
    Malformed { file: PathBuf, err: String },

    #[error(transparent)]
    TimeSeries(#[from] TimeSeriesError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Errors from a [`super::StatsSink`].
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Line {line} of {file} isn't a trend record: {err}")]
    BadRecord {
        file: PathBuf,
        line: usize,
        #[source]
        err: serde_json::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Unsupported configuration for {mnemonic}: {reason}")]
    Unsupported { mnemonic: String, reason: String },

    #[error("Couldn't determine the current time: {0}")]
    Clock(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    TimeSeries(#[from] TimeSeriesError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Averaging(#[from] AveragingError),

    #[error(transparent)]
    Params(#[from] ParamsError),
}

impl MonitorError {
    /// Should a whole run stop because of this error, rather than only the
    /// mnemonic that caused it?
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::Fetch(FetchError::Authentication(_) | FetchError::Service(_))
                | MonitorError::Sink(_)
                | MonitorError::Clock(_)
        )
    }
}
