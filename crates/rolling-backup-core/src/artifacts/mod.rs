//! Writers for the two artifacts of a backup run: `data.zip` and `db.gz`.

pub mod archive;
pub mod dump;

use std::path::{Path, PathBuf};

use crate::config::DatabaseConfig;
use crate::error::Error;

pub use archive::ZipArchiver;
pub use dump::MysqlDumper;

pub const ARCHIVE_FILE_NAME: &str = "data.zip";
pub const DUMP_FILE_NAME: &str = "db.gz";

/// Produces an archive of `source` inside `dest_dir`, returning its path.
pub trait Archiver: Send + Sync {
    fn archive(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf, Error>;
}

/// Produces a compressed database dump inside `dest_dir`, returning its path.
pub trait DatabaseDumper: Send + Sync {
    fn dump(&self, database: &DatabaseConfig, dest_dir: &Path) -> Result<PathBuf, Error>;
}
