// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to parse averaging durations like "5_min" or "1.5_hours".

mod error;

pub use error::UnitParseError;

use hifitime::Duration;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub(crate) enum TimeUnit {
    #[strum(serialize = "min")]
    Minute,

    #[strum(serialize = "sec")]
    Second,

    #[strum(serialize = "hour")]
    Hour,

    #[strum(serialize = "day")]
    Day,
}

impl TimeUnit {
    fn duration(self, amount: f64) -> Duration {
        match self {
            TimeUnit::Minute => Duration::from_seconds(amount * 60.0),
            TimeUnit::Second => Duration::from_seconds(amount),
            TimeUnit::Hour => Duration::from_hours(amount),
            TimeUnit::Day => Duration::from_days(amount),
        }
    }
}

/// Parse a duration string of the form "NUMBER_UNIT". The unit only needs to
/// contain one of "min", "sec", "hour" or "day", so "5_minutes" and
/// "2_Hours" are both fine.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, UnitParseError> {
    let (number, unit) = match s.trim().split('_').collect::<Vec<_>>().as_slice() {
        [number, unit] => (*number, *unit),
        _ => return Err(UnitParseError::Malformed(s.to_string())),
    };

    let lower = unit.to_lowercase();
    let time_unit = TimeUnit::iter()
        .find(|tu| {
            let tu_str: &'static str = (*tu).into();
            lower.contains(tu_str)
        })
        .ok_or_else(|| UnitParseError::UnknownUnit {
            input: s.to_string(),
            unit: unit.to_string(),
        })?;

    let amount: f64 = number
        .trim()
        .parse()
        .map_err(|_| UnitParseError::GotTimeUnitButCantParse(s.to_string()))?;
    if !(amount > 0.0 && amount.is_finite()) {
        return Err(UnitParseError::NotPositive(s.to_string()));
    }

    Ok(time_unit.duration(amount))
}
