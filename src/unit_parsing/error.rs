// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnitParseError {
    #[error("Expected a duration of the form 'NUMBER_UNIT' (e.g. '5_min'), but got '{0}'")]
    Malformed(String),

    #[error("Successfully parsed a time unit, but could not parse the numerical component of '{0}'")]
    GotTimeUnitButCantParse(String),

    #[error("Unsupported time unit '{unit}' in '{input}'; supported units are sec, min, hour and day")]
    UnknownUnit { input: String, unit: String },

    #[error("The duration '{0}' is not positive")]
    NotPositive(String),
}
