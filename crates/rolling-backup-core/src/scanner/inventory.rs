use chrono::NaiveDate;
use std::fmt::Write;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Error;

/// A dated directory directly below the backup root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub date: NaiveDate,
}

/// A directory below the backup root whose name is not a backup date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrayDirectory {
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct Inventory {
    pub entries: Vec<BackupEntry>,
    pub strays: Vec<StrayDirectory>,
}

/// Parse a directory name as a backup date.
///
/// The name must round-trip: `2023-1-5` parses under `%Y-%m-%d` but is not
/// how this tool names its directories, so it is rejected.
pub fn parse_backup_date(name: &str, date_format: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(name, date_format).ok()?;
    if format_backup_date(date, date_format).ok()? == name {
        Some(date)
    } else {
        None
    }
}

/// Directory name for `date`.
///
/// Fails when the format asks for something a calendar date does not carry
/// (`%H`, `%s`, ...) or renders to an empty name.
pub fn format_backup_date(date: NaiveDate, date_format: &str) -> Result<String, Error> {
    let mut name = String::new();
    write!(name, "{}", date.format(date_format))
        .map_err(|_| Error::Other(format!("Date format '{}' can not render a date", date_format)))?;
    if name.is_empty() {
        return Err(Error::Other(format!("Date format '{}' renders an empty name", date_format)));
    }
    Ok(name)
}

/// List the immediate subdirectories of `root`, split into dated entries and strays.
///
/// Symlinks and plain files are neither. No ordering is guaranteed.
pub fn take_inventory(root: &Path, date_format: &str) -> io::Result<Inventory> {
    let mut result = Inventory::default();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let parsed = entry
            .file_name()
            .to_str()
            .and_then(|name| parse_backup_date(name, date_format));

        match parsed {
            Some(date) => result.entries.push(BackupEntry {
                path: entry.into_path(),
                date,
            }),
            None => result.strays.push(StrayDirectory {
                path: entry.into_path(),
            }),
        }
    }

    Ok(result)
}

/// Dated backup directories directly below `root`.
pub fn scan(root: &Path, date_format: &str) -> io::Result<Vec<BackupEntry>> {
    Ok(take_inventory(root, date_format)?.entries)
}

/// Stable ascending sort by date; both deletion policies walk this order.
pub fn sort_oldest_first(entries: &mut [BackupEntry]) {
    entries.sort_by_key(|entry| entry.date);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DATE_FORMAT;
    use std::fs;
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DEFAULT_DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_valid_dates_round_trip() {
        for name in ["2023-01-01", "2024-02-29", "1999-12-31"] {
            let parsed = parse_backup_date(name, DEFAULT_DATE_FORMAT).unwrap();
            assert_eq!(parsed.format(DEFAULT_DATE_FORMAT).to_string(), name);
        }
    }

    #[test]
    fn test_parse_rejects_non_dates() {
        for name in [
            "archive-old",
            "log",
            "2023-02-30",
            "2023-13-01",
            "2023-1-5",
            "2023-01-01-extra",
            " 2023-01-01",
            "",
        ] {
            assert_eq!(parse_backup_date(name, DEFAULT_DATE_FORMAT), None, "{name:?}");
        }
    }

    #[test]
    fn test_parse_custom_format() {
        assert_eq!(parse_backup_date("20230315", "%Y%m%d"), Some(date("2023-03-15")));
        assert_eq!(parse_backup_date("2023-03-15", "%Y%m%d"), None);
    }

    #[test]
    fn test_format_rejects_time_fields() {
        let day = date("2023-03-15");
        assert_eq!(format_backup_date(day, DEFAULT_DATE_FORMAT).unwrap(), "2023-03-15");
        assert!(format_backup_date(day, "%Y-%m-%d_%H").is_err());
        assert!(format_backup_date(day, "").is_err());
    }

    #[test]
    fn test_parse_with_time_fields_does_not_panic() {
        assert_eq!(parse_backup_date("2023-03-15_04", "%Y-%m-%d_%H"), None);
    }

    #[test]
    fn test_inventory_splits_entries_and_strays() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("2023-03-01")).unwrap();
        fs::create_dir(root.path().join("2023-01-01")).unwrap();
        fs::create_dir(root.path().join("archive-old")).unwrap();
        fs::create_dir_all(root.path().join("2023-03-01").join("2020-01-01")).unwrap();
        fs::write(root.path().join("2022-01-01"), b"not a directory").unwrap();

        let mut found = take_inventory(root.path(), DEFAULT_DATE_FORMAT).unwrap();
        sort_oldest_first(&mut found.entries);

        let dates: Vec<NaiveDate> = found.entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date("2023-01-01"), date("2023-03-01")]);
        assert_eq!(found.strays.len(), 1);
        assert!(found.strays[0].path.ends_with("archive-old"));
    }

    #[test]
    fn test_scan_missing_root_is_an_error() {
        let root = tempdir().unwrap();
        assert!(scan(&root.path().join("missing"), DEFAULT_DATE_FORMAT).is_err());
    }

    #[test]
    fn test_sort_is_stable_for_equal_dates() {
        let mut entries = vec![
            BackupEntry { path: "b".into(), date: date("2023-02-01") },
            BackupEntry { path: "x".into(), date: date("2023-01-01") },
            BackupEntry { path: "a".into(), date: date("2023-02-01") },
        ];
        sort_oldest_first(&mut entries);
        let paths: Vec<&str> = entries.iter().map(|e| e.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["x", "b", "a"]);
    }
}
