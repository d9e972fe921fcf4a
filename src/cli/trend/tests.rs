// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use approx::assert_abs_diff_eq;
use clap::Parser;
use hifitime::Duration;
use indoc::indoc;
use tempfile::{tempdir, TempDir};

use super::*;
use crate::{
    monitor::ArchiveFile,
    time_series::{Samples, Sampling},
};

fn write_series<F: Fn(usize) -> f64>(dir: &Path, name: &str, f: F) {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 1);
    let n = 3 * 24 + 1;
    let contents = ArchiveFile {
        sampling: Sampling::AllPoints,
        unit: None,
        times: (0..n)
            .map(|i| (start + Duration::from_hours(i as f64)).to_mjd_utc_days())
            .collect(),
        values: Samples::Numeric((0..n).map(f).collect()),
    };
    std::fs::write(
        dir.join(format!("{name}.json")),
        serde_json::to_string(&contents).unwrap(),
    )
    .unwrap();
}

/// An archive of hourly temperatures (the hour of the day) and a current that
/// is on for the first 12 hours of each day, Feb 1 to Feb 4 2022, with a
/// mnemonic file to trend them.
fn setup() -> TempDir {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("archive");
    std::fs::create_dir(&archive).unwrap();
    write_series(&archive, "TEMP", |i| (i % 24) as f64);
    write_series(&archive, "CURR", |i| if i % 24 < 12 { 1.0 } else { 0.0 });
    std::fs::write(
        dir.path().join("mnemonics.toml"),
        indoc! {r#"
            [[block_means]]
            name = "TEMP"
            dependency = [{ name = "CURR", relation = ">", threshold = 0.5 }]

            [[all]]
            name = "CURR"
        "#},
    )
    .unwrap();
    dir
}

fn args(dir: &TempDir) -> TrendArgs {
    TrendArgs {
        archive: Some(dir.path().join("archive")),
        mnemonics: Some(dir.path().join("mnemonics.toml")),
        output: Some(dir.path().join("trends.jsonl")),
        start: Some("2022-02-01T00:00:00".to_string()),
        end: Some("2022-02-04T00:00:00".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_merge_prefers_cli_args() {
    let dir = tempdir().unwrap();
    let arg_file = dir.path().join("args.toml");
    std::fs::write(
        &arg_file,
        indoc! {r#"
            archive = "/data/archive"
            output = "file.jsonl"
            clip_sigma = 2.5
            remove_outer_points = true
        "#},
    )
    .unwrap();

    let merged = TrendArgs {
        args_file: Some(arg_file),
        output: Some(PathBuf::from("cli.jsonl")),
        ..Default::default()
    }
    .merge()
    .unwrap();
    assert_eq!(merged.archive, Some(PathBuf::from("/data/archive")));
    assert_eq!(merged.output, Some(PathBuf::from("cli.jsonl")));
    assert_eq!(merged.clip_sigma, Some(2.5));
    assert!(merged.remove_outer_points);
    assert!(merged.args_file.is_none());
}

#[test]
fn test_merge_bad_arg_file() {
    let dir = tempdir().unwrap();
    let arg_file = dir.path().join("args.yaml");
    std::fs::write(&arg_file, "archive: here").unwrap();
    let result = TrendArgs {
        args_file: Some(arg_file),
        ..Default::default()
    }
    .merge();
    assert!(matches!(result, Err(TrendingError::ArgFile(_))));

    let arg_file = dir.path().join("args.json");
    std::fs::write(&arg_file, "{ not json").unwrap();
    let result = TrendArgs {
        args_file: Some(arg_file),
        ..Default::default()
    }
    .merge();
    assert!(matches!(result, Err(TrendingError::ArgFile(_))));
}

#[test]
fn test_parse_missing_args() {
    let dir = setup();
    let result = TrendArgs {
        archive: None,
        ..args(&dir)
    }
    .parse();
    assert!(matches!(result, Err(TrendArgsError::NoArchive)));

    let result = TrendArgs {
        archive: Some(dir.path().join("mnemonics.toml")),
        ..args(&dir)
    }
    .parse();
    assert!(matches!(result, Err(TrendArgsError::ArchiveNotDir(_))));

    let result = TrendArgs {
        output: None,
        ..args(&dir)
    }
    .parse();
    assert!(matches!(result, Err(TrendArgsError::NoOutput)));

    let result = TrendArgs {
        mnemonics: None,
        ..args(&dir)
    }
    .parse();
    assert!(matches!(result, Err(TrendArgsError::NoMnemonics)));

    // Nothing is left after filtering by name.
    let result = TrendArgs {
        names: Some(vec!["NOPE".to_string()]),
        ..args(&dir)
    }
    .parse();
    assert!(matches!(result, Err(TrendArgsError::NoMnemonics)));
}

#[test]
fn test_parse_bad_values() {
    let dir = setup();
    let result = TrendArgs {
        start: Some("soon".to_string()),
        ..args(&dir)
    }
    .parse();
    assert!(matches!(
        result,
        Err(TrendArgsError::BadTime { arg: "start", .. })
    ));

    let result = TrendArgs {
        end: Some("2022-01-01T00:00:00".to_string()),
        ..args(&dir)
    }
    .parse();
    assert!(matches!(result, Err(TrendArgsError::EndBeforeStart { .. })));

    let result = TrendArgs {
        clip_sigma: Some(-1.0),
        ..args(&dir)
    }
    .parse();
    assert!(matches!(result, Err(TrendArgsError::BadClipSigma(_))));

    let result = TrendArgs {
        duplicates: Some("keep_both".to_string()),
        ..args(&dir)
    }
    .parse();
    assert!(matches!(result, Err(TrendArgsError::BadDuplicatePolicy(_))));
}

#[test]
fn test_parse() {
    let dir = setup();
    let params = TrendArgs {
        names: Some(vec!["TEMP".to_string(), "VOLT".to_string()]),
        clip_iterations: Some(2),
        duplicates: Some("KEEP_LAST".to_string()),
        end: None,
        ..args(&dir)
    }
    .parse()
    .unwrap();
    assert_eq!(params.mnemonics.len(), 1);
    assert_eq!(
        params.start,
        Some(Epoch::from_gregorian_utc_at_midnight(2022, 2, 1))
    );
    assert!(params.end.is_none());
    assert_eq!(params.clip.max_iters, 2);
    assert_abs_diff_eq!(params.clip.sigma, DEFAULT_CLIP_SIGMA);
    assert_eq!(params.duplicate_policy, DuplicatePolicy::KeepLast);
}

#[test]
fn test_trend() {
    let dir = setup();
    let output = dir.path().join("trends.jsonl");

    args(&dir).run(true).unwrap();
    assert!(!output.exists());

    let archive = dir.path().join("archive").display().to_string();
    let mnemonics = dir.path().join("mnemonics.toml").display().to_string();
    let output_str = output.display().to_string();
    #[rustfmt::skip]
    let cli = TrendArgs::parse_from([
        "trend",
        "--archive", archive.as_str(),
        "--mnemonics", mnemonics.as_str(),
        "--output", output_str.as_str(),
        "--start", "2022-02-01T00:00:00",
        "--end", "2022-02-04T00:00:00",
    ]);
    cli.run(false).unwrap();

    let records = JsonLinesSink::new(&output).read_all().unwrap();
    assert_eq!(records.len(), 2);
    let temp = &records[0];
    assert_eq!(temp.identifier, "TEMP");
    assert_eq!(temp.kind, "block_means");
    assert_eq!(
        temp.means,
        vec![Some(5.5), Some(0.0), Some(5.5), Some(0.0), Some(5.5), Some(0.0)]
    );
    assert!(temp.sample_times.is_none());

    let curr = &records[1];
    assert_eq!(curr.kind, "all");
    assert_eq!(curr.times.len(), 3);
    // Midnights are shared between queries.
    assert_eq!(curr.sample_times.as_ref().map(Vec::len), Some(73));

    // TEMP carries on from Feb 4, so there's nothing new for it.
    TrendArgs {
        start: None,
        ..args(&dir)
    }
    .run(false)
    .unwrap();
    assert_eq!(JsonLinesSink::new(&output).read_all().unwrap().len(), 2);
}
