// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use edb_trending::{monitor::StoredRecord, JsonLinesSink};

use super::*;

fn trend(fixture: &Fixture, extra: &[&str]) -> Result<Output, OutputError> {
    let archive = fixture.archive.display().to_string();
    let mnemonics = fixture.mnemonics.display().to_string();
    let output = fixture.output.display().to_string();
    #[rustfmt::skip]
    let mut args = vec![
        "trend",
        "--no-progress-bars",
        "--archive", archive.as_str(),
        "--mnemonics", mnemonics.as_str(),
        "--output", output.as_str(),
    ];
    args.extend_from_slice(extra);
    edb_trending().args(&args).ok()
}

fn records(fixture: &Fixture) -> Vec<StoredRecord> {
    JsonLinesSink::new(&fixture.output).read_all().unwrap()
}

#[test]
fn test_trend() {
    let fixture = fixture();
    let cmd = trend(
        &fixture,
        &["--start", "2022-02-01T00:00:00", "--end", "2022-02-03T00:00:00"],
    );
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let records = records(&fixture);
    assert_eq!(records.len(), 2);

    let block = &records[0];
    assert_eq!(block.identifier, "HEATER_TEMP_ON");
    assert_eq!(block.kind, "block_means");
    assert_eq!(block.unit.as_deref(), Some("K"));
    // Each day: the 12 hours the heater is on, then the following midnight.
    assert_eq!(
        block.means,
        vec![Some(5.5), Some(0.0), Some(5.5), Some(0.0)]
    );

    let every_change = &records[1];
    assert_eq!(every_change.identifier, "HEATER_TEMP");
    assert_eq!(every_change.kind, "every_change");
    assert_eq!(
        every_change.labels.as_deref(),
        Some(["F560W".to_string(), "F560W".to_string(), "F1000W".to_string()].as_slice())
    );
    // Day one is all F560W; day two changes to F1000W at 06:00.
    assert_abs_diff_eq!(every_change.means[0].unwrap(), 276.0 / 25.0, epsilon = 1e-9);
    assert_abs_diff_eq!(every_change.means[1].unwrap(), 15.0 / 6.0, epsilon = 1e-9);
    assert_abs_diff_eq!(every_change.means[2].unwrap(), 261.0 / 19.0, epsilon = 1e-9);
}

#[test]
fn test_trend_resumes() {
    let fixture = fixture();
    let cmd = trend(
        &fixture,
        &["--start", "2022-02-01T00:00:00", "--end", "2022-02-02T12:00:00"],
    );
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    assert_eq!(records(&fixture)[0].means.len(), 2);

    // The second day is picked up from where the first run finished.
    let cmd = trend(&fixture, &["--end", "2022-02-03T12:00:00", "--names", "HEATER_TEMP"]);
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let records = records(&fixture);
    assert_eq!(records.len(), 4);
    assert_abs_diff_eq!(
        records[2].latest_query,
        Epoch::from_gregorian_utc_at_midnight(2022, 2, 2).to_mjd_utc_days(),
        epsilon = 1e-9
    );
    assert_eq!(records[2].means.len(), 2);
}

#[test]
fn test_trend_dry_run() {
    let fixture = fixture();
    let cmd = trend(&fixture, &["--dry-run"]);
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    assert!(!fixture.output.exists());
}

#[test]
fn test_trend_bad_args() {
    let fixture = fixture();
    let cmd = trend(&fixture, &["--start", "the day before yesterday"]);
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("Couldn't parse the start time"), "{stderr}");

    let cmd = edb_trending()
        .args(["trend", "--output", "/tmp/nowhere.jsonl"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("No archive directory was specified"), "{stderr}");
}
