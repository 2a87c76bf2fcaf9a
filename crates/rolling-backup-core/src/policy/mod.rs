//! Deletion policies over the dated directories of a backup root.
//!
//! Both policies only ever touch [`BackupEntry`] directories and walk them
//! oldest first. A failed deletion is recorded and the walk moves on.

pub mod reclaim;
pub mod retention;

use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, error};

pub use reclaim::{reclaim, reclaim_entries, ReclaimOutcome};
pub use retention::{sweep, sweep_entries, SweepOutcome};

use crate::scanner::BackupEntry;

#[derive(Debug)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

fn try_delete_directory(entry: &BackupEntry) -> Result<(), DeletionFailure> {
    match fs::remove_dir_all(&entry.path) {
        Ok(()) => {
            debug!("Deleted {}", entry.path.display());
            Ok(())
        }
        Err(err) => {
            error!("Failed to delete {}: {}", entry.path.display(), err);
            Err(DeletionFailure {
                path: entry.path.clone(),
                error: err,
            })
        }
    }
}
