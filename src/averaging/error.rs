// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::time_series::TimeSeriesError;

#[derive(Error, Debug)]
pub enum AveragingError {
    #[error("Every-change statistics of {0} need a dependency series, but none was given")]
    MissingDependency(String),

    #[error("The averaging interval must be positive, but got {0}")]
    NonPositiveInterval(hifitime::Duration),

    #[error(transparent)]
    TimeSeries(#[from] TimeSeriesError),
}
