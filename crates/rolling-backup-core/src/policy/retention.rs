use chrono::NaiveDate;
use std::io;
use std::path::Path;
use tracing::{info, warn};

use super::{try_delete_directory, DeletionFailure};
use crate::scanner::{sort_oldest_first, take_inventory, BackupEntry};

#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub deleted: Vec<BackupEntry>,
    pub retained: Vec<BackupEntry>,
    pub failures: Vec<DeletionFailure>,
}

/// Age of `entry` in whole days as of `today`.
pub fn age_in_days(entry: &BackupEntry, today: NaiveDate) -> i64 {
    (today - entry.date).num_days()
}

pub fn is_expired(entry: &BackupEntry, today: NaiveDate, retention_days: i64) -> bool {
    age_in_days(entry, today) > retention_days
}

/// Delete every backup directory under `root` older than `retention_days`.
///
/// Directories whose names are not dates are logged and left alone.
pub fn sweep(
    root: &Path,
    today: NaiveDate,
    retention_days: i64,
    date_format: &str,
) -> io::Result<SweepOutcome> {
    let found = take_inventory(root, date_format)?;
    for stray in &found.strays {
        info!("Unknown directory in backup root {}", stray.path.display());
    }
    Ok(sweep_entries(found.entries, today, retention_days))
}

pub fn sweep_entries(
    mut entries: Vec<BackupEntry>,
    today: NaiveDate,
    retention_days: i64,
) -> SweepOutcome {
    sort_oldest_first(&mut entries);

    let mut outcome = SweepOutcome::default();
    for entry in entries {
        if !is_expired(&entry, today, retention_days) {
            outcome.retained.push(entry);
            continue;
        }

        match try_delete_directory(&entry) {
            Ok(()) => outcome.deleted.push(entry),
            Err(failure) => {
                warn!("Can not delete {}", failure.path.display());
                outcome.failures.push(failure);
            }
        }
    }

    outcome
}
