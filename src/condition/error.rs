// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("{0} has no samples; cannot test a relation against it")]
    EmptyInput(String),

    #[error("Unrecognised relation '{0}'; expected one of =, ==, !=, <, <=, >, >=")]
    AmbiguousRelation(String),

    #[error("{identifier} holds {kind} values, but the threshold '{threshold}' is not {kind}")]
    ThresholdMismatch {
        identifier: String,
        threshold: String,
        kind: &'static str,
    },
}
