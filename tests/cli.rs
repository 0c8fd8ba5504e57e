use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;

fn thunkpool() -> Command {
    Command::cargo_bin("thunkpool").unwrap()
}

// `thunkpool` with no args should exit with a non-zero code.
#[test]
fn cli_no_args() {
    thunkpool().assert().failure();
}

// `thunkpool -V` should print the version
#[test]
fn cli_version() {
    thunkpool()
        .args(["-V"])
        .assert()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_sum_sample_data() {
    thunkpool()
        .args(["--threads", "3", "sum"])
        .assert()
        .success()
        .stdout(contains("Total sum of elements: 219"));
}

#[test]
fn cli_sum_values_on_every_pool() {
    for pool in ["shared", "dispatcher", "rayon"] {
        thunkpool()
            .args(["--pool", pool, "--threads", "2", "sum", "1", "2", "3", "-4"])
            .assert()
            .success()
            .stdout(contains("Total sum of elements: 2"));
    }
}

#[test]
fn cli_sum_json() {
    thunkpool()
        .args(["--format", "json", "--threads", "4", "sum", "--chunks", "5"])
        .assert()
        .success()
        .stdout(contains(r#""total":219"#))
        .stdout(contains(r#""chunks":5"#));
}

#[test]
fn cli_check_one() {
    thunkpool()
        .args(["--pool", "dispatcher", "--threads", "2", "check", "no-threads-double-wait"])
        .assert()
        .success()
        .stdout(contains("no-threads-double-wait: ok"));
}

#[test]
fn cli_check_all_json() {
    thunkpool()
        .args(["--format", "json", "--threads", "4", "check", "--all"])
        .assert()
        .success()
        .stdout(contains(r#""scenario":"reuse-thread-pool""#))
        .stdout(contains(r#""scenario":"simple""#))
        .stdout(contains(r#""completed":17"#));
}

#[test]
fn cli_check_unknown() {
    thunkpool().args(["check", "bogus"]).assert().failure();
}

#[test]
fn cli_check_zero_threads_rejects_jobs() {
    thunkpool()
        .args(["--threads", "0", "check", "simple"])
        .assert()
        .failure()
        .stderr(contains("no worker threads"));
}

#[test]
fn cli_sum_overflow_fails_cleanly() {
    thunkpool()
        .args(["--threads", "2", "sum", "9223372036854775807", "1", "--chunks", "2"])
        .assert()
        .failure()
        .stderr(contains("sum overflows i64"));
}
