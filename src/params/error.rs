// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use crate::{condition::ConditionError, unit_parsing::UnitParseError};

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Unknown telemetry kind '{0}'; supported kinds are: {}", *super::TELEMETRY_KINDS_COMMA_SEPARATED)]
    UnknownKind(String),

    #[error("Mnemonic {name}: plot_data must be 'nominal' or '*<MNEMONIC>', but got '{plot_data}'")]
    BadPlotData { name: String, plot_data: String },

    #[error("Mnemonic {0}: the product of two mnemonics cannot be trended as every_change telemetry")]
    ProductEveryChange(String),

    #[error("Mnemonic {name}: every_change telemetry needs exactly one dependency, but {count} were given")]
    EveryChangeDependencies { name: String, count: usize },

    #[error("Mnemonic {0}: time_interval telemetry needs a mean_time_block")]
    MissingMeanTimeBlock(String),

    #[error("Mnemonic {name}: bad mean_time_block: {err}")]
    MeanTimeBlock {
        name: String,
        #[source]
        err: UnitParseError,
    },

    #[error("Mnemonic {name}: bad dependency on {dependency}: {err}")]
    Relation {
        name: String,
        dependency: String,
        #[source]
        err: ConditionError,
    },

    #[error("A mnemonic entry under '{0}' has an empty name")]
    EmptyName(String),

    #[error("Mnemonic file '{0}' doesn't have a recognised file extension! Valid extensions are: json, toml")]
    UnknownFileType(PathBuf),

    #[error("Couldn't decode the mnemonic file '{file}': {err}")]
    Decode { file: PathBuf, err: String },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
