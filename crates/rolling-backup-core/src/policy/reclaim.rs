use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{try_delete_directory, DeletionFailure};
use crate::progress::ProgressReporter;
use crate::scanner::{directory_size, scan, sort_oldest_first, BackupEntry};

#[derive(Debug, Default)]
pub struct ReclaimOutcome {
    pub freed_bytes: u64,
    pub deleted: Vec<BackupEntry>,
    pub failures: Vec<DeletionFailure>,
    /// Whether `freed_bytes` ended strictly above the requested amount.
    pub target_reached: bool,
}

/// Delete backup directories under `root`, oldest first, until more than
/// `required_bytes` have been freed or nothing is left to delete.
pub fn reclaim(
    root: &Path,
    required_bytes: u64,
    date_format: &str,
    reporter: &dyn ProgressReporter,
) -> io::Result<ReclaimOutcome> {
    let entries = scan(root, date_format)?;
    Ok(reclaim_entries(entries, required_bytes, reporter))
}

/// Freed space is the size measured just before each deletion. Actual free
/// disk space is not re-checked afterwards.
pub fn reclaim_entries(
    mut entries: Vec<BackupEntry>,
    required_bytes: u64,
    reporter: &dyn ProgressReporter,
) -> ReclaimOutcome {
    sort_oldest_first(&mut entries);

    let mut outcome = ReclaimOutcome::default();
    for entry in entries {
        let size = match directory_size(&entry.path) {
            Ok(size) => size,
            Err(err) => {
                warn!("Can not measure {}: {}", entry.path.display(), err);
                0
            }
        };

        match try_delete_directory(&entry) {
            Ok(()) => {
                outcome.freed_bytes += size;
                debug!(
                    "Reclaimed {} bytes from {} ({} of {} bytes)",
                    size,
                    entry.path.display(),
                    outcome.freed_bytes,
                    required_bytes
                );
                outcome.deleted.push(entry);
                reporter.on_reclaim_progress(outcome.freed_bytes, required_bytes);
            }
            Err(failure) => outcome.failures.push(failure),
        }

        if outcome.freed_bytes > required_bytes {
            outcome.target_reached = true;
            break;
        }
    }

    if !outcome.target_reached {
        info!(
            "Reclamation exhausted all backups: freed {} of {} bytes",
            outcome.freed_bytes, required_bytes
        );
    }

    outcome
}
