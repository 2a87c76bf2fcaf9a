use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use rolling_backup_core::config::DEFAULT_DATE_FORMAT;
use rolling_backup_core::policy::{reclaim, reclaim_entries, sweep, sweep_entries};
use rolling_backup_core::scanner::{scan, BackupEntry};
use rolling_backup_core::SilentReporter;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DEFAULT_DATE_FORMAT).unwrap()
}

/// Create `root/<name>/` holding a `data.zip` of `bytes` bytes.
fn make_backup(root: &Path, name: &str, bytes: usize) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("data.zip"), vec![0u8; bytes]).unwrap();
    dir
}

fn surviving_names(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_sweep_keeps_only_entries_within_retention() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let today = date("2023-03-31");
    make_backup(root, "2023-03-31", 10); // age 0
    make_backup(root, "2023-03-01", 10); // age 30
    make_backup(root, "2023-02-28", 10); // age 31
    make_backup(root, "2022-01-01", 10); // age 454

    let outcome = sweep(root, today, 30, DEFAULT_DATE_FORMAT).unwrap();

    assert_eq!(outcome.deleted.len(), 2);
    assert!(outcome.failures.is_empty());
    assert_eq!(surviving_names(root), vec!["2023-03-01", "2023-03-31"]);
    for entry in scan(root, DEFAULT_DATE_FORMAT).unwrap() {
        assert!((today - entry.date).num_days() <= 30);
    }
}

#[test]
fn test_sweep_ignores_non_date_directories() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    make_backup(root, "archive-old", 10);
    make_backup(root, "log", 10);
    make_backup(root, "2000-01-01", 10);

    let outcome = sweep(root, date("2023-03-31"), 30, DEFAULT_DATE_FORMAT).unwrap();

    assert_eq!(outcome.deleted.len(), 1);
    assert_eq!(surviving_names(root), vec!["archive-old", "log"]);
}

#[test]
fn test_sweep_continues_after_failed_deletion() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let old = make_backup(root, "2022-06-01", 10);
    let entries = vec![
        BackupEntry {
            path: root.join("2022-01-01"),
            date: date("2022-01-01"),
        },
        BackupEntry {
            path: old,
            date: date("2022-06-01"),
        },
    ];

    let outcome = sweep_entries(entries, date("2023-03-31"), 30);

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].path, root.join("2022-01-01"));
    assert_eq!(outcome.deleted.len(), 1);
    assert!(!root.join("2022-06-01").exists());
}

#[test]
fn test_reclaim_deletes_oldest_first_and_stops() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    make_backup(root, "2023-03-01", 100);
    make_backup(root, "2023-01-01", 100);
    make_backup(root, "2023-02-01", 100);

    let outcome = reclaim(root, 150, DEFAULT_DATE_FORMAT, &SilentReporter).unwrap();

    let deleted: Vec<NaiveDate> = outcome.deleted.iter().map(|e| e.date).collect();
    assert_eq!(deleted, vec![date("2023-01-01"), date("2023-02-01")]);
    assert_eq!(outcome.freed_bytes, 200);
    assert!(outcome.target_reached);
    assert_eq!(surviving_names(root), vec!["2023-03-01"]);
}

#[test]
fn test_reclaim_needs_strictly_more_than_required() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    make_backup(root, "2023-01-01", 100);
    make_backup(root, "2023-02-01", 100);
    make_backup(root, "2023-03-01", 100);

    // 200 freed is not > 200, so a third directory goes too.
    let outcome = reclaim(root, 200, DEFAULT_DATE_FORMAT, &SilentReporter).unwrap();

    assert_eq!(outcome.deleted.len(), 3);
    assert_eq!(outcome.freed_bytes, 300);
    assert!(outcome.target_reached);
}

#[test]
fn test_reclaim_is_best_effort_when_target_unreachable() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    make_backup(root, "2023-01-01", 100);
    make_backup(root, "2023-02-01", 100);
    make_backup(root, "archive-old", 5_000);

    let outcome = reclaim(root, 10_000, DEFAULT_DATE_FORMAT, &SilentReporter).unwrap();

    // Every dated entry is gone, the stray is untouched and not counted.
    assert_eq!(outcome.freed_bytes, 200);
    assert!(!outcome.target_reached);
    assert_eq!(surviving_names(root), vec!["archive-old"]);
}

#[test]
fn test_reclaim_skips_failed_deletions_without_counting_them() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let second = make_backup(root, "2023-02-01", 100);
    let third = make_backup(root, "2023-03-01", 100);
    let entries = vec![
        BackupEntry {
            path: third,
            date: date("2023-03-01"),
        },
        BackupEntry {
            path: root.join("2023-01-01"),
            date: date("2023-01-01"),
        },
        BackupEntry {
            path: second,
            date: date("2023-02-01"),
        },
    ];

    let outcome = reclaim_entries(entries, 50, &SilentReporter);

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.deleted.len(), 1);
    assert_eq!(outcome.deleted[0].date, date("2023-02-01"));
    assert_eq!(outcome.freed_bytes, 100);
    assert_eq!(surviving_names(root), vec!["2023-03-01"]);
}

#[test]
fn test_reclaim_freed_bytes_grow_with_each_deletion() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    make_backup(root, "2023-01-01", 10);
    make_backup(root, "2023-01-02", 20);
    make_backup(root, "2023-01-03", 30);

    let before = scan(root, DEFAULT_DATE_FORMAT).unwrap().len();
    let outcome = reclaim(root, 25, DEFAULT_DATE_FORMAT, &SilentReporter).unwrap();
    let after = scan(root, DEFAULT_DATE_FORMAT).unwrap().len();

    assert_eq!(outcome.freed_bytes, 30);
    assert_eq!(after, before - outcome.deleted.len());
    assert_eq!(surviving_names(root), vec!["2023-01-03"]);
}
