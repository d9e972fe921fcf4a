// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all edb-trending-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::trend::TrendArgsError;
use crate::{
    averaging::AveragingError,
    condition::ConditionError,
    monitor::{FetchError, MonitorError, SinkError},
    params::ParamsError,
    time_series::TimeSeriesError,
};

/// The *only* publicly visible error from edb-trending. Messages for
/// configuration problems carry a hint on where to look.
#[derive(Error, Debug)]
pub enum TrendingError {
    /// An error related to the arguments of `trend`.
    #[error("{0}")]
    Trend(String),

    /// An error in a mnemonic file.
    #[error("{0}\n\nCheck the mnemonic file; 'edb-trending verify' summarises what it contains.")]
    Mnemonics(String),

    /// An error from the telemetry archive.
    #[error("{0}")]
    Archive(String),

    /// An error from the statistics output.
    #[error("{0}")]
    Sink(String),

    /// An error related to argument files.
    #[error("{0}")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<TrendArgsError> for TrendingError {
    fn from(e: TrendArgsError) -> Self {
        match e {
            TrendArgsError::Params(e) => Self::from(e),
            _ => Self::Trend(e.to_string()),
        }
    }
}

impl From<ParamsError> for TrendingError {
    fn from(e: ParamsError) -> Self {
        match e {
            ParamsError::IO(e) => Self::from(e),
            _ => Self::Mnemonics(e.to_string()),
        }
    }
}

impl From<MonitorError> for TrendingError {
    fn from(e: MonitorError) -> Self {
        let s = e.to_string();
        match e {
            MonitorError::Fetch(e) => Self::from(e),
            MonitorError::Sink(e) => Self::from(e),
            MonitorError::Params(e) => Self::from(e),
            MonitorError::Unsupported { .. } => Self::Mnemonics(s),
            MonitorError::Clock(_)
            | MonitorError::TimeSeries(_)
            | MonitorError::Condition(_)
            | MonitorError::Averaging(_) => Self::Generic(s),
        }
    }
}

impl From<FetchError> for TrendingError {
    fn from(e: FetchError) -> Self {
        Self::Archive(e.to_string())
    }
}

impl From<SinkError> for TrendingError {
    fn from(e: SinkError) -> Self {
        Self::Sink(e.to_string())
    }
}

impl From<TimeSeriesError> for TrendingError {
    fn from(e: TimeSeriesError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<ConditionError> for TrendingError {
    fn from(e: ConditionError) -> Self {
        Self::Mnemonics(e.to_string())
    }
}

impl From<AveragingError> for TrendingError {
    fn from(e: AveragingError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for TrendingError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
