use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

fn arraytab() -> Command {
    Command::new(env!("CARGO_BIN_EXE_arraytab"))
}

fn run_ok(cwd: &Path, args: &[&str]) -> Output {
    let out = arraytab()
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("run arraytab");
    assert!(
        out.status.success(),
        "expected success\nargs={args:?}\nstatus={}\nstdout={}\nstderr={}",
        out.status,
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
    out
}

fn run_err(cwd: &Path, args: &[&str]) -> Output {
    let out = arraytab()
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("run arraytab");
    assert!(
        !out.status.success(),
        "expected failure\nargs={args:?}\nstdout={}",
        String::from_utf8_lossy(&out.stdout),
    );
    out
}

fn stdout_json(out: &Output) -> Value {
    serde_json::from_slice(&out.stdout).expect("stdout is json")
}

#[test]
fn create_set_attr_and_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = dir.path();

    run_ok(cwd, &["create", "probe.atab"]);
    run_ok(cwd, &["set-attr", "probe.atab", "Title", "Mission X"]);

    let out = run_ok(cwd, &["--json", "inspect", "probe.atab"]);
    let v = stdout_json(&out);
    assert_eq!(v["name"], "probe.atab");
    assert_eq!(v["variables"], 0);
    assert_eq!(v["attributes"], 1);
    assert_eq!(v["record_columns"], 1);

    let out = run_ok(cwd, &["--json", "entries", "probe.atab"]);
    let rows = stdout_json(&out);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["Name"], "Title");
    assert_eq!(rows[0]["Entryid"], 1);
    assert_eq!(rows[0]["Nelems"], 9);
    assert_eq!(rows[0]["Value"], "Mission X");

    // Replacing the entry in place keeps a single row.
    run_ok(
        cwd,
        &["set-attr", "probe.atab", "Title", "Mission Y", "--entry", "1"],
    );
    let out = run_ok(cwd, &["--json", "entries", "probe.atab"]);
    let rows = stdout_json(&out);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["Value"], "Mission Y");
}

#[test]
fn missing_containers_fail_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_err(dir.path(), &["vars", "nope.atab"]);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("nope.atab"), "stderr: {stderr}");
}

#[test]
fn attrs_and_vars_list_empty_containers() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = dir.path();
    run_ok(cwd, &["create", "empty.atab"]);

    let out = run_ok(cwd, &["--json", "vars", "empty.atab"]);
    assert_eq!(stdout_json(&out).as_array().unwrap().len(), 0);
    let out = run_ok(cwd, &["--json", "attrs", "empty.atab"]);
    assert_eq!(stdout_json(&out).as_array().unwrap().len(), 0);
    let out = run_ok(cwd, &["--json", "records", "empty.atab"]);
    assert_eq!(stdout_json(&out).as_array().unwrap().len(), 0);
}
