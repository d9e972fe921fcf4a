// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod trend;
mod verify;

use std::{
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use hifitime::{Duration, Epoch};
use indoc::indoc;
use tempfile::TempDir;

use edb_trending::{monitor::ArchiveFile, Samples, Sampling};

fn edb_trending() -> Command {
    Command::cargo_bin("edb-trending").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn write_archive_file(dir: &Path, name: &str, contents: &ArchiveFile) {
    std::fs::write(
        dir.join(format!("{name}.json")),
        serde_json::to_string(contents).unwrap(),
    )
    .unwrap();
}

/// The paths of a test archive, its mnemonic file and where statistics go.
struct Fixture {
    _dir: TempDir,
    archive: PathBuf,
    mnemonics: PathBuf,
    output: PathBuf,
}

/// Two days of hourly telemetry from 2022-02-01: a heater temperature that
/// follows the hour of the day, a heater current that is on for the first 12
/// hours of each day, and a change-only filter wheel position.
fn fixture() -> Fixture {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let archive = dir.path().join("archive");
    std::fs::create_dir(&archive).unwrap();

    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 1);
    let n = 2 * 24 + 1;
    let times: Vec<f64> = (0..n)
        .map(|i| (start + Duration::from_hours(i as f64)).to_mjd_utc_days())
        .collect();
    write_archive_file(
        &archive,
        "HEATER_TEMP",
        &ArchiveFile {
            sampling: Sampling::AllPoints,
            unit: Some("K".to_string()),
            times: times.clone(),
            values: Samples::Numeric((0..n).map(|i| (i % 24) as f64).collect()),
        },
    );
    write_archive_file(
        &archive,
        "HEATER_CURRENT",
        &ArchiveFile {
            sampling: Sampling::AllPoints,
            unit: Some("A".to_string()),
            times,
            values: Samples::Numeric(
                (0..n)
                    .map(|i| if i % 24 < 12 { 0.3 } else { 0.0 })
                    .collect(),
            ),
        },
    );
    write_archive_file(
        &archive,
        "FILTER_POS",
        &ArchiveFile {
            sampling: Sampling::ChangeOnly,
            unit: None,
            times: vec![
                start.to_mjd_utc_days(),
                (start + Duration::from_hours(30.0)).to_mjd_utc_days(),
            ],
            values: Samples::Text(vec!["F560W".to_string(), "F1000W".to_string()]),
        },
    );

    let mnemonics = dir.path().join("mnemonics.toml");
    std::fs::write(
        &mnemonics,
        indoc! {r#"
            [[block_means]]
            name = "HEATER_TEMP"
            database_id = "HEATER_TEMP_ON"
            dependency = [{ name = "HEATER_CURRENT", relation = ">", threshold = 0.2 }]

            [[every_change]]
            name = "HEATER_TEMP"
            dependency = [{ name = "FILTER_POS", relation = "=", threshold = "F560W" }]
        "#},
    )
    .unwrap();

    let output = dir.path().join("trends.jsonl");
    Fixture {
        _dir: dir,
        archive,
        mnemonics,
        output,
    }
}
