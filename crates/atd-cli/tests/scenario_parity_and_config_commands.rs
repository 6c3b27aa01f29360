//! Scenario: offline commands that need neither a database nor a venue.
//!
//! # Invariants under test
//! 1. `atd parity` runs the whole battery and reports zero diffs.
//! 2. `atd config-hash` is stable across runs and honours layer order.
//! 3. Secrets in a config layer are refused.

use std::io::Write;

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn yaml(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

fn config_hash_line(paths: &[&std::path::Path]) -> String {
    let mut cmd = assert_cmd::Command::cargo_bin("atd-cli").unwrap();
    cmd.arg("config-hash");
    for p in paths {
        cmd.arg(p);
    }
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .find(|l| l.starts_with("config_hash="))
        .unwrap()
        .to_string()
}

#[test]
fn parity_battery_reports_zero_diffs() {
    let mut cmd = assert_cmd::Command::cargo_bin("atd-cli").unwrap();
    cmd.arg("parity");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("parity_diffs=0"))
        .stdout(predicate::str::contains("scenario=long_entry_default_config action=execute"));
}

#[test]
fn config_hash_is_stable_and_layered() {
    let base = yaml("runtime:\n  default_max_position_usd: 100\n  tick_lock_ttl_secs: 120\n");
    let deploy = yaml("runtime:\n  absolute_max_notional_usd: 2500\n");

    let a = config_hash_line(&[base.path(), deploy.path()]);
    let b = config_hash_line(&[base.path(), deploy.path()]);
    assert_eq!(a, b);

    let base_only = config_hash_line(&[base.path()]);
    assert_ne!(a, base_only);

    let mut cmd = assert_cmd::Command::cargo_bin("atd-cli").unwrap();
    cmd.args(["config-hash"]).arg(base.path()).arg(deploy.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("absolute_max_notional_usd=2500"));
}

#[test]
fn config_hash_refuses_invalid_runtime_section() {
    let bad = yaml("runtime:\n  tick_lock_ttl_secs: 0\n");

    let mut cmd = assert_cmd::Command::cargo_bin("atd-cli").unwrap();
    cmd.arg("config-hash").arg(bad.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("tick_lock_ttl_secs must be > 0"));
}
