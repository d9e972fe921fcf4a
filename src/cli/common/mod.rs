// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Things shared by the `edb-trending` subcommands: argument files, time
//! parsing and printers.

mod printers;

pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};

use std::str::FromStr;

use hifitime::Epoch;
use itertools::Itertools;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{params::TELEMETRY_KINDS_COMMA_SEPARATED, time_series::DuplicatePolicy};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    pub(super) static ref MNEMONICS_HELP: String =
        format!("A JSON or TOML file mapping telemetry kinds to mnemonic entries. Supported kinds: {}", *TELEMETRY_KINDS_COMMA_SEPARATED);

    pub(super) static ref DUPLICATES_HELP: String =
        format!("What to do when two queries give different values at the same time. Supported policies: {}. Default: {}",
                DuplicatePolicy::iter().join(", "), DuplicatePolicy::default());
}

pub(super) const TIME_HELP: &str = "An ISO 8601 UTC time (e.g. 2022-02-01T00:00:00) or a UTC MJD";

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(TrendingError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(TrendingError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(TrendingError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

/// Parse a user-supplied time. A bare number is a UTC MJD; anything else goes
/// to hifitime, which assumes UTC unless a time scale is given.
pub(super) fn parse_time(s: &str) -> Result<Epoch, String> {
    let s = s.trim();
    if let Ok(mjd) = s.parse::<f64>() {
        return if mjd.is_finite() {
            Ok(Epoch::from_mjd_utc(mjd))
        } else {
            Err(format!("'{s}' is not a finite MJD"))
        };
    }
    Epoch::from_str(s).map_err(|e| e.to_string())
}
