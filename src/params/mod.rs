// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mnemonic configuration.
//!
//! A mnemonic file maps each kind of telemetry to the mnemonics that are
//! trended that way, e.g. (JSON)
//!
//! ```json
//! {
//!   "daily_means": [
//!     {
//!       "name": "SE_ZIMIRICEA",
//!       "database_id": "SE_ZIMIRICEA_NO_PIX",
//!       "dependency": [{"name": "IMIR_HK_ICE_SEC_VOLT1", "relation": ">", "threshold": 25}],
//!       "plot_data": "*IMIR_HK_ICE_SEC_VOLT1"
//!     }
//!   ]
//! }
//! ```
//!
//! Entries are parsed leniently by `serde`; [`MnemonicFile::validate`] checks
//! everything that can be checked before any telemetry is fetched.

mod error;

pub use error::ParamsError;

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use hifitime::Duration;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    averaging::AveragingPolicy,
    condition::{Comparator, Threshold},
    constants::{DAILY_MEANS_QUERY_DAYS, DEFAULT_QUERY_DAYS},
    unit_parsing::parse_duration,
};

lazy_static::lazy_static! {
    pub(crate) static ref TELEMETRY_KINDS_COMMA_SEPARATED: String = {
        let base = AveragingKind::iter().map(|k| {
            let s: &'static str = k.into();
            s
        });
        let combos = AveragingKind::iter()
            .filter(|&k| k != AveragingKind::All)
            .map(|k| format!("all+{k}"));
        base.map(String::from).chain(combos).join(", ")
    };
}

/// How the samples of a mnemonic are summarised.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
pub enum AveragingKind {
    #[strum(serialize = "daily_means")]
    DailyMeans,

    #[strum(serialize = "block_means")]
    BlockMeans,

    #[strum(serialize = "time_interval")]
    TimeInterval,

    #[strum(serialize = "every_change")]
    EveryChange,

    /// Every sample is kept, and the whole query is summarised at once.
    #[strum(to_string = "all", serialize = "none")]
    All,
}

/// A kind of telemetry, as used for the keys of a mnemonic file. Besides the
/// plain kinds, "all+<kind>" trends the mnemonic as `<kind>` and also keeps
/// every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TelemetryKind {
    pub averaging: AveragingKind,
    pub keep_samples: bool,
}

impl TelemetryKind {
    pub fn new(averaging: AveragingKind) -> TelemetryKind {
        TelemetryKind {
            averaging,
            keep_samples: averaging == AveragingKind::All,
        }
    }

    /// How much telemetry is fetched per query.
    pub fn query_duration(self) -> Duration {
        match self.averaging {
            AveragingKind::DailyMeans => Duration::from_days(DAILY_MEANS_QUERY_DAYS),
            _ => Duration::from_days(DEFAULT_QUERY_DAYS),
        }
    }

    /// Is there a history of previous queries to resume from?
    pub fn has_history(self) -> bool {
        self.averaging != AveragingKind::All
    }
}

impl FromStr for TelemetryKind {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<TelemetryKind, ParamsError> {
        let unknown = || ParamsError::UnknownKind(s.to_string());
        let lower = s.trim().to_lowercase();
        match lower.split_once('+') {
            Some(("all", averaged)) => match AveragingKind::from_str(averaged) {
                Ok(AveragingKind::All) | Err(_) => Err(unknown()),
                Ok(averaging) => Ok(TelemetryKind {
                    averaging,
                    keep_samples: true,
                }),
            },
            Some(_) => Err(unknown()),
            None => AveragingKind::from_str(&lower)
                .map(TelemetryKind::new)
                .map_err(|_| unknown()),
        }
    }
}

impl std::fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.keep_samples && self.averaging != AveragingKind::All {
            write!(f, "all+{}", self.averaging)
        } else {
            write!(f, "{}", self.averaging)
        }
    }
}

/// What is trended for a mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotData {
    /// The mnemonic itself.
    Nominal,

    /// The product of the mnemonic and another one.
    Product(String),
}

/// A condition on another mnemonic (or the mnemonic itself) that must hold
/// for a sample to be trended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyConfig {
    pub name: String,
    pub relation: String,
    pub threshold: Threshold,
}

impl DependencyConfig {
    pub fn comparator(&self) -> Result<Comparator, crate::condition::ConditionError> {
        self.relation.parse()
    }
}

fn nominal() -> String {
    "nominal".to_string()
}

/// One entry of a mnemonic file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnemonicConfig {
    /// The archive's name for the mnemonic.
    pub name: String,

    /// The name results are stored under, if not `name`.
    #[serde(default)]
    pub database_id: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub dependency: Vec<DependencyConfig>,

    #[serde(default = "nominal")]
    pub plot_data: String,

    /// The averaging duration of time_interval telemetry, e.g. "5_min".
    #[serde(default)]
    pub mean_time_block: Option<String>,

    #[serde(default)]
    pub plot_category: Option<String>,
}

impl MnemonicConfig {
    pub fn new<S: Into<String>>(name: S) -> MnemonicConfig {
        MnemonicConfig {
            name: name.into(),
            database_id: None,
            description: None,
            dependency: vec![],
            plot_data: nominal(),
            mean_time_block: None,
            plot_category: None,
        }
    }

    /// The name results are stored under.
    pub fn identifier(&self) -> &str {
        self.database_id.as_deref().unwrap_or(&self.name)
    }

    /// Only the text before the first comma of `plot_data` is significant.
    pub fn plot_data(&self) -> Result<PlotData, ParamsError> {
        let bad = || ParamsError::BadPlotData {
            name: self.name.clone(),
            plot_data: self.plot_data.clone(),
        };
        let first = self.plot_data.split(',').next().unwrap_or_default().trim();
        if first.contains("nominal") {
            Ok(PlotData::Nominal)
        } else if let Some(other) = first.strip_prefix('*') {
            if other.is_empty() {
                Err(bad())
            } else {
                Ok(PlotData::Product(other.to_string()))
            }
        } else {
            Err(bad())
        }
    }

    /// The name results are stored under; for products, "IDENT*OTHER".
    pub fn product_identifier(&self) -> Result<String, ParamsError> {
        Ok(match self.plot_data()? {
            PlotData::Nominal => self.identifier().to_string(),
            PlotData::Product(other) => format!("{}*{other}", self.identifier()),
        })
    }

    pub fn averaging_policy(&self, kind: TelemetryKind) -> Result<AveragingPolicy, ParamsError> {
        Ok(match kind.averaging {
            AveragingKind::DailyMeans => AveragingPolicy::DailyMeans,
            AveragingKind::BlockMeans => AveragingPolicy::BlockMeans,
            AveragingKind::EveryChange => AveragingPolicy::EveryChange,
            AveragingKind::All => AveragingPolicy::None,
            AveragingKind::TimeInterval => {
                let block = self
                    .mean_time_block
                    .as_deref()
                    .ok_or_else(|| ParamsError::MissingMeanTimeBlock(self.name.clone()))?;
                let duration = parse_duration(block).map_err(|err| ParamsError::MeanTimeBlock {
                    name: self.name.clone(),
                    err,
                })?;
                AveragingPolicy::TimeInterval(duration)
            }
        })
    }

    /// Check everything about this entry for telemetry of `kind`.
    pub fn validate(&self, kind: TelemetryKind) -> Result<(), ParamsError> {
        if self.name.trim().is_empty() {
            return Err(ParamsError::EmptyName(kind.to_string()));
        }
        let plot_data = self.plot_data()?;
        for dep in &self.dependency {
            dep.comparator().map_err(|err| ParamsError::Relation {
                name: self.name.clone(),
                dependency: dep.name.clone(),
                err,
            })?;
        }
        self.averaging_policy(kind)?;
        if kind.averaging == AveragingKind::EveryChange {
            if let PlotData::Product(_) = plot_data {
                return Err(ParamsError::ProductEveryChange(self.name.clone()));
            }
            if self.dependency.len() != 1 {
                return Err(ParamsError::EveryChangeDependencies {
                    name: self.name.clone(),
                    count: self.dependency.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Display, EnumIter, EnumString)]
enum MnemonicFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

/// Mnemonics grouped by telemetry kind, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MnemonicFile {
    groups: IndexMap<TelemetryKind, Vec<MnemonicConfig>>,
}

impl MnemonicFile {
    /// Read and validate a JSON or TOML mnemonic file.
    pub fn read<P: AsRef<Path>>(file: P) -> Result<MnemonicFile, ParamsError> {
        let file = file.as_ref();
        debug!("Attempting to parse mnemonic file {}", file.display());
        let file_type = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| MnemonicFileType::from_str(&e).ok())
            .ok_or_else(|| ParamsError::UnknownFileType(file.to_path_buf()))?;

        let mut contents = String::new();
        File::open(file)?.read_to_string(&mut contents)?;
        let decode_err = |err: String| ParamsError::Decode {
            file: PathBuf::from(file),
            err,
        };
        let raw: IndexMap<String, Vec<MnemonicConfig>> = match file_type {
            MnemonicFileType::Toml => {
                toml::from_str(&contents).map_err(|e| decode_err(e.to_string()))?
            }
            MnemonicFileType::Json => {
                serde_json::from_str(&contents).map_err(|e| decode_err(e.to_string()))?
            }
        };
        MnemonicFile::from_raw(raw)
    }

    /// Parse the kinds of already-decoded groups and validate every entry.
    pub fn from_raw(raw: IndexMap<String, Vec<MnemonicConfig>>) -> Result<MnemonicFile, ParamsError> {
        let mut groups: IndexMap<TelemetryKind, Vec<MnemonicConfig>> = IndexMap::new();
        for (kind, entries) in raw {
            let kind: TelemetryKind = kind.parse()?;
            trace!("{} {kind} mnemonics", entries.len());
            groups.entry(kind).or_default().extend(entries);
        }
        let file = MnemonicFile { groups };
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        for (kind, config) in self.iter() {
            config.validate(kind)?;
        }
        Ok(())
    }

    pub fn groups(&self) -> &IndexMap<TelemetryKind, Vec<MnemonicConfig>> {
        &self.groups
    }

    pub fn push(&mut self, kind: TelemetryKind, config: MnemonicConfig) {
        self.groups.entry(kind).or_default().push(config);
    }

    /// Every entry with its kind.
    pub fn iter(&self) -> impl Iterator<Item = (TelemetryKind, &MnemonicConfig)> {
        self.groups
            .iter()
            .flat_map(|(&kind, configs)| configs.iter().map(move |c| (kind, c)))
    }

    /// The total number of entries.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Only keep mnemonics with any of the given names.
    pub fn retain_names(&mut self, names: &[String]) {
        for configs in self.groups.values_mut() {
            configs.retain(|c| names.iter().any(|n| n == &c.name));
        }
        self.groups.retain(|_, configs| !configs.is_empty());
    }
}
