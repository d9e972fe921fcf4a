// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

#[test]
fn test_verify_mnemonic_file() {
    let Fixture {
        _dir, mnemonics, ..
    } = fixture();
    let cmd = edb_trending()
        .args(["verify", &mnemonics.display().to_string()])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("2 mnemonics"), "{stdout}");
    assert!(stdout.contains("HEATER_TEMP when HEATER_CURRENT > 0.2"), "{stdout}");
}

#[test]
fn test_verify_bad_mnemonic_file() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let file = dir.path().join("mnemonics.json");
    std::fs::write(
        &file,
        r#"{"time_interval": [{"name": "HEATER_TEMP", "mean_time_block": "5_fortnights"}]}"#,
    )
    .unwrap();

    let cmd = edb_trending()
        .args(["verify", &file.display().to_string()])
        .ok();
    assert!(cmd.is_err());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stdout.contains("fortnights"), "{stdout}");
    assert!(stderr.contains("1 of 1 mnemonic files are invalid"), "{stderr}");
}

#[test]
fn test_no_subcommand_prints_help() {
    let cmd = edb_trending().ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("trend"), "{stderr}");
}
