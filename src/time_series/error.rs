// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use hifitime::Epoch;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeSeriesError {
    #[error("{identifier}: got {timestamps} timestamps but {values} values")]
    LengthMismatch {
        identifier: String,
        timestamps: usize,
        values: usize,
    },

    #[error("{identifier}: timestamp {index} ({time}) is earlier than the one before it")]
    Unsorted {
        identifier: String,
        index: usize,
        time: Epoch,
    },

    #[error("{identifier}: block boundaries {blocks:?} are not strictly increasing from 0 to {len}")]
    InvalidBlocks {
        identifier: String,
        blocks: Vec<usize>,
        len: usize,
    },

    #[error("Cannot combine {left} with {right}; one holds numbers and the other holds text")]
    MismatchedKinds { left: String, right: String },

    #[error("{0} holds text values, but numbers are required here")]
    NotNumeric(String),

    #[error("{identifier}: two different values were recorded at {time}")]
    DuplicateConflict { identifier: String, time: Epoch },
}
