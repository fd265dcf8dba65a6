use indoc::indoc;
use std::fs;
use std::path::Path;
use tclish_core::db::journal::now_secs;
use tclish_core::{Interpreter, InterpreterConfig, Reply};
use tempfile::TempDir;

fn open(base: &Path) -> Interpreter {
    let config = InterpreterConfig {
        db_file: Some(base.to_path_buf()),
        ..InterpreterConfig::default()
    };
    Interpreter::new(config).unwrap()
}

fn steps_file(base: &Path) -> std::path::PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".steps");
    name.into()
}

#[test]
fn test_journal_creates_files() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("store");
    open(&base);
    assert!(dir.path().join("store.steps").exists());
    assert!(dir.path().join("store.snapshots").exists());
}

#[test]
fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("store");

    let mut first = open(&base);
    let source = indoc! {"
        db set user name Ada
        db set user lang {a [weird] |value|}
        db set tmp 1
        db prune tmp
    "};
    assert!(!first.run(source).is_error());
    drop(first);

    let mut second = open(&base);
    assert_eq!(second.run("db get user name"), Reply::ok("Ada"));
    assert_eq!(second.run("db get user lang"), Reply::ok("a [weird] |value|"));
    assert_eq!(second.run("db has tmp"), Reply::empty());
}

#[test]
fn test_snapshot_roundtrip() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("store");
    let mut interp = open(&base);

    let source = indoc! {"
        db set counter 1
        db create-snapshot first
        db set counter 2
        db create-snapshot
        db set counter 3
    "};
    interp.run(source);
    assert_eq!(interp.run("db load-snapshot first\ndb get counter"), Reply::ok("1"));
    assert_eq!(interp.run("db load-snapshot\ndb get counter"), Reply::ok("1"));

    let listed = interp.run("db list-snapshots");
    let labels = tclish_core::text::unpack(listed.value());
    assert_eq!(labels[0], "first");
    assert_eq!(labels.len(), 2);
    assert!(labels[1].contains(':'));

    drop(interp);
    let mut reopened = open(&base);
    assert_eq!(reopened.run("db get counter"), Reply::ok("1"));
}

#[test]
fn test_missing_snapshot() {
    let dir = TempDir::new().unwrap();
    let mut interp = open(&dir.path().join("store"));
    let reply = interp.run("db load-snapshot nightly");
    assert!(reply
        .value()
        .starts_with("<db load-snapshot> no snapshot named nightly"));
}

#[test]
fn test_revert_replays_older_steps() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("store");
    let now = now_secs() as u64;
    let journal = format!(
        "set [color|red] 1000\nset [size|big] 2000\nset [color|blue] {}\n",
        now
    );
    fs::write(steps_file(&base), journal).unwrap();

    let mut interp = open(&base);
    assert_eq!(interp.run("db get color"), Reply::ok("blue"));

    assert_eq!(interp.run("db revert hours 1"), Reply::empty());
    assert_eq!(interp.run("db get color"), Reply::ok("red"));
    assert_eq!(interp.run("db get size"), Reply::ok("big"));
    assert_eq!(interp.run("db list-snapshots 1"), Reply::ok("{'revert'}"));

    drop(interp);
    let mut reopened = open(&base);
    assert_eq!(reopened.run("db get color"), Reply::ok("red"));
}

#[test]
fn test_corrupt_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("store");
    fs::write(steps_file(&base), "set [a|1] 5\nthis is not a step\nset [b|2] 6\n").unwrap();

    let mut interp = open(&base);
    assert_eq!(interp.run("db get a"), Reply::ok("1"));
    assert_eq!(interp.run("db get b"), Reply::ok("2"));
}

#[test]
fn test_tree_rendering() {
    let mut interp = Interpreter::new(InterpreterConfig::default()).unwrap();
    interp.run("db set a b 1\ndb set a c 2");
    let rendered = interp.run("db tree").into_value();
    insta::assert_snapshot!(rendered.trim_end(), @r"
    * a
      * b *
      * c *
    ");
}
