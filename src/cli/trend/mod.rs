// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Trend mnemonics against a directory archive, appending the statistics to a
//! JSON-lines file.

#[cfg(test)]
mod tests;

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use hifitime::Epoch;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{
    display_warnings, parse_time, InfoPrinter, Warn, ARG_FILE_HELP, DUPLICATES_HELP,
    MNEMONICS_HELP, TIME_HELP,
};
use crate::{
    averaging::ClipParams,
    constants::{DEFAULT_CLIP_SIGMA, DEFAULT_MAX_CLIP_ITERS},
    monitor::{
        DependencyCache, DirectoryArchive, JsonLinesSink, MonitorError, RunSummary,
        TelemetryMonitor,
    },
    params::{MnemonicFile, ParamsError},
    time_series::DuplicatePolicy,
    TrendingError,
};

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct TrendArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The directory of the telemetry archive. Each mnemonic's telemetry is in
    /// a JSON file named after the mnemonic.
    #[clap(short, long, help_heading = "INPUT FILES")]
    pub(super) archive: Option<PathBuf>,

    #[clap(short, long, help = MNEMONICS_HELP.as_str(), help_heading = "INPUT FILES")]
    pub(super) mnemonics: Option<PathBuf>,

    /// Only trend the mnemonics with these names.
    #[clap(short, long, multiple_values(true), help_heading = "INPUT FILES")]
    pub(super) names: Option<Vec<String>>,

    /// Don't use the first and last samples of each query. Use this for
    /// archives that return a sample on either side of the requested times.
    #[clap(long, help_heading = "INPUT FILES")]
    #[serde(default)]
    pub(super) remove_outer_points: bool,

    /// The file that statistics are appended to, one JSON object per line. It
    /// also records how far each mnemonic has been trended.
    #[clap(short, long, help_heading = "OUTPUT FILES")]
    pub(super) output: Option<PathBuf>,

    /// Where trending starts. If not given, each mnemonic carries on from
    /// where it was last trended in the output file.
    #[clap(long, help = TIME_HELP, help_heading = "TIMES")]
    pub(super) start: Option<String>,

    /// Where trending ends. Default: now
    #[clap(long, help = TIME_HELP, help_heading = "TIMES")]
    pub(super) end: Option<String>,

    /// Samples further than this many standard deviations from the mean are
    /// clipped before statistics are calculated.
    #[clap(long, help_heading = "STATISTICS")]
    pub(super) clip_sigma: Option<f64>,

    /// The most clipping iterations.
    #[clap(long, help_heading = "STATISTICS")]
    pub(super) clip_iterations: Option<u32>,

    #[clap(long, help = DUPLICATES_HELP.as_str(), help_heading = "STATISTICS")]
    pub(super) duplicates: Option<String>,
}

impl TrendArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<TrendArgs, TrendingError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let TrendArgs {
                args_file: _,
                archive,
                mnemonics,
                names,
                remove_outer_points,
                output,
                start,
                end,
                clip_sigma,
                clip_iterations,
                duplicates,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(TrendArgs {
                args_file: None,
                archive: cli_args.archive.or(archive),
                mnemonics: cli_args.mnemonics.or(mnemonics),
                names: cli_args.names.or(names),
                remove_outer_points: cli_args.remove_outer_points || remove_outer_points,
                output: cli_args.output.or(output),
                start: cli_args.start.or(start),
                end: cli_args.end.or(end),
                clip_sigma: cli_args.clip_sigma.or(clip_sigma),
                clip_iterations: cli_args.clip_iterations.or(clip_iterations),
                duplicates: cli_args.duplicates.or(duplicates),
            })
        } else {
            Ok(cli_args)
        }
    }

    fn parse(self) -> Result<TrendParams, TrendArgsError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            archive,
            mnemonics,
            names,
            remove_outer_points,
            output,
            start,
            end,
            clip_sigma,
            clip_iterations,
            duplicates,
        } = self;

        let archive = archive.ok_or(TrendArgsError::NoArchive)?;
        if !archive.is_dir() {
            return Err(TrendArgsError::ArchiveNotDir(archive));
        }
        let output = output.ok_or(TrendArgsError::NoOutput)?;
        let mnemonics_file = mnemonics.ok_or(TrendArgsError::NoMnemonics)?;
        let mut mnemonics = MnemonicFile::read(&mnemonics_file)?;

        if let Some(names) = names {
            for name in &names {
                if !mnemonics.iter().any(|(_, c)| &c.name == name) {
                    format!(
                        "{name} isn't in {}; ignoring it",
                        mnemonics_file.display()
                    )
                    .warn();
                }
            }
            mnemonics.retain_names(&names);
        }
        if mnemonics.is_empty() {
            return Err(TrendArgsError::NoMnemonics);
        }

        let parse = |arg: &'static str, time: Option<String>| {
            time.map(|t| {
                parse_time(&t).map_err(|err| TrendArgsError::BadTime { arg, time: t, err })
            })
            .transpose()
        };
        let start = parse("start", start)?;
        let end = parse("end", end)?;
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                return Err(TrendArgsError::EndBeforeStart { start, end });
            }
        }

        let sigma = clip_sigma.unwrap_or(DEFAULT_CLIP_SIGMA);
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(TrendArgsError::BadClipSigma(sigma));
        }
        let max_iters = clip_iterations.unwrap_or(DEFAULT_MAX_CLIP_ITERS);

        let duplicate_policy = match duplicates {
            Some(d) => DuplicatePolicy::from_str(&d.to_lowercase())
                .map_err(|_| TrendArgsError::BadDuplicatePolicy(d))?,
            None => DuplicatePolicy::default(),
        };

        let mut printer = InfoPrinter::new("Trending".into());
        printer.push_block(vec![
            format!("Archive:   {}", archive.display()).into(),
            format!("Mnemonics: {}", mnemonics_file.display()).into(),
            format!("Output:    {}", output.display()).into(),
        ]);
        let mut block = vec![format!("{} mnemonics", mnemonics.len()).into()];
        for (kind, configs) in mnemonics.groups() {
            block.push(format!("{kind}: {}", configs.len()).into());
        }
        printer.push_block(block);
        printer.push_line(
            match (start, end) {
                (Some(s), Some(e)) => format!("From {s} to {e}"),
                (Some(s), None) => format!("From {s} to now"),
                (None, Some(e)) => format!("From each mnemonic's last query to {e}"),
                (None, None) => "From each mnemonic's last query to now".to_string(),
            }
            .into(),
        );
        printer.push_line(format!("Clipping at {sigma}σ, at most {max_iters} times").into());
        printer.display();
        display_warnings();

        Ok(TrendParams {
            archive,
            mnemonics,
            output,
            start,
            end,
            clip: ClipParams { sigma, max_iters },
            remove_outer_points,
            duplicate_policy,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), TrendingError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run()?;
        Ok(())
    }
}

struct TrendParams {
    archive: PathBuf,
    mnemonics: MnemonicFile,
    output: PathBuf,
    start: Option<Epoch>,
    end: Option<Epoch>,
    clip: ClipParams,
    remove_outer_points: bool,
    duplicate_policy: DuplicatePolicy,
}

impl TrendParams {
    fn run(self) -> Result<RunSummary, MonitorError> {
        let now = Epoch::now().map_err(|e| MonitorError::Clock(e.to_string()))?;
        let mut monitor = TelemetryMonitor::new(
            DirectoryArchive::new(&self.archive),
            JsonLinesSink::new(&self.output),
            DependencyCache::new(),
            now,
        )
        .with_clip(self.clip)
        .with_remove_outer_points(self.remove_outer_points)
        .with_duplicate_policy(self.duplicate_policy);
        let summary = monitor.run(&self.mnemonics, self.start, self.end)?;

        let mut printer = InfoPrinter::new("Summary".into());
        printer.push_line(format!("{} mnemonics trended", summary.stored.len()).into());
        printer.push_line(format!("{} already up to date", summary.up_to_date.len()).into());
        printer.display();
        for (identifier, err) in &summary.failed {
            format!("{identifier} was not trended: {err}").warn();
        }
        display_warnings();

        Ok(summary)
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum TrendArgsError {
    #[error("No archive directory was specified")]
    NoArchive,

    #[error("The archive '{}' is not a directory", .0.display())]
    ArchiveNotDir(PathBuf),

    #[error("No mnemonics were specified, or none are left after filtering by name")]
    NoMnemonics,

    #[error("No output file was specified")]
    NoOutput,

    #[error("Couldn't parse the {arg} time '{time}': {err}")]
    BadTime {
        arg: &'static str,
        time: String,
        err: String,
    },

    #[error("The end time ({end}) is not after the start time ({start})")]
    EndBeforeStart { start: Epoch, end: Epoch },

    #[error("The clipping sigma must be a positive number, not {0}")]
    BadClipSigma(f64),

    #[error("Unknown duplicate policy '{0}'")]
    BadDuplicatePolicy(String),

    #[error(transparent)]
    Params(#[from] ParamsError),
}
