//! End-to-end tests driving `decus_grep_rust::run` the way the real
//! `grep` binary would be invoked: an argument iterator and real files on
//! disk, asserting on exit status and captured stdout/stderr. These cover
//! spec.md §8's concrete scenarios plus the CLI-level edge cases (`-e`,
//! unknown flags, file-not-found) that the in-memory `driver`/`cli` unit
//! tests don't reach.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!("decus-grep-rust-test-{}-{}-{}", std::process::id(), n, name));
    let mut f = fs::File::create(&path).unwrap();
    f.write_all(contents).unwrap();
    path
}

fn run_args(args: &[&str]) -> (u8, String, String) {
    let args: Vec<OsString> = args.iter().map(OsString::from).collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let status = decus_grep_rust::run(args.into_iter(), &mut stdout, &mut stderr);
    (status, String::from_utf8(stdout).unwrap(), String::from_utf8(stderr).unwrap())
}

fn cleanup(paths: &[&Path]) {
    for p in paths {
        let _ = fs::remove_file(p);
    }
}

#[test]
fn scenario_1_literal_match() {
    let f = temp_file("s1", b"hello world\ngoodbye\n");
    let (status, out, _) = run_args(&["hello", f.to_str().unwrap()]);
    assert_eq!(status, 0);
    assert_eq!(out, "hello world\n");
    cleanup(&[&f]);
}

#[test]
fn scenario_2_anchored() {
    let f = temp_file("s2", b"abcdef\n abcdef\n");
    let (status, out, _) = run_args(&["^abc", f.to_str().unwrap()]);
    assert_eq!(status, 0);
    assert_eq!(out, "abcdef\n");
    cleanup(&[&f]);
}

#[test]
fn scenario_4_backreference() {
    let f = temp_file("s4", b"aa\nab\naaa\n");
    let (status, out, _) = run_args([r"\(a\)\1", f.to_str().unwrap()].as_slice());
    assert_eq!(status, 0);
    assert_eq!(out, "aa\naaa\n");
    cleanup(&[&f]);
}

#[test]
fn scenario_6_count_two_files() {
    let f1 = temp_file("s6a", b"q\nq\nr\n");
    let f2 = temp_file("s6b", b"r\n");
    let (status, out, _) = run_args(&["-c", "q", f1.to_str().unwrap(), f2.to_str().unwrap()]);
    assert_eq!(status, 0);
    let f1_name = f1.to_str().unwrap();
    let f2_name = f2.to_str().unwrap();
    assert_eq!(out, format!("{f1_name}:2\n{f2_name}:0\n"));
    cleanup(&[&f1, &f2]);
}

#[test]
fn scenario_7_character_class() {
    let f = temp_file("s7", b"B\nd\na\n");
    let (status, out, _) = run_args(&["[A-Ca]", f.to_str().unwrap()]);
    assert_eq!(status, 0);
    assert_eq!(out, "B\na\n");
    cleanup(&[&f]);
}

#[test]
fn scenario_9_unbalanced_group_is_exit_2_no_output() {
    let f = temp_file("s9", b"anything\n");
    let (status, out, err) = run_args([r"\)", f.to_str().unwrap()].as_slice());
    assert_eq!(status, 2);
    assert_eq!(out, "");
    assert!(!err.is_empty());
    cleanup(&[&f]);
}

#[test]
fn e_flag_allows_pattern_starting_with_dash() {
    let f = temp_file("se", b"-verbose\nquiet\n");
    let (status, out, _) = run_args(&["-e", "-verbose", f.to_str().unwrap()]);
    assert_eq!(status, 0);
    assert_eq!(out, "-verbose\n");
    cleanup(&[&f]);
}

#[test]
fn unknown_flag_is_fatal() {
    let (status, out, err) = run_args(&["-Q", "pat"]);
    assert_eq!(status, 2);
    assert_eq!(out, "");
    assert!(err.contains("unknown flag"));
}

#[test]
fn missing_file_is_fatal() {
    let (status, _, err) = run_args(&["pat", "/no/such/file/decus-grep-rust-test"]);
    assert_eq!(status, 2);
    assert!(err.contains("can't open"));
}

#[test]
fn no_match_is_exit_1() {
    let f = temp_file("nomatch", b"abc\n");
    let (status, out, _) = run_args(&["zzz", f.to_str().unwrap()]);
    assert_eq!(status, 1);
    assert_eq!(out, "");
    cleanup(&[&f]);
}

#[test]
fn list_only_with_no_files_is_exit_1() {
    let (status, out, _) = run_args(&["-l", "pat"]);
    assert_eq!(status, 1);
    assert_eq!(out, "");
}
