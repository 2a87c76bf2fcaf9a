use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Database dump exited with {status}: {stderr}")]
    Dump {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Failures that abort a run before any backup artifact is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// The configured date format can not name a backup directory.
    DateFormat,
    /// The log directory or the run's log file could not be created.
    LogSetup,
    /// The backup root could not be created.
    BackupRoot,
    /// The dated directory for this run could not be created.
    RunDirectory,
}

impl FatalKind {
    /// Process exit code reported by the CLI for this failure.
    pub fn exit_code(self) -> i32 {
        match self {
            FatalKind::LogSetup => 2,
            FatalKind::BackupRoot => 3,
            FatalKind::RunDirectory => 4,
            FatalKind::DateFormat => 5,
        }
    }
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FatalKind::LogSetup => "log setup",
            FatalKind::BackupRoot => "backup root creation",
            FatalKind::RunDirectory => "run directory creation",
            FatalKind::DateFormat => "date formatting",
        };
        f.write_str(label)
    }
}

/// Failures that are logged and recorded while the run carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverableKind {
    SizeProbe,
    /// Listing the backup root failed; nothing was deleted.
    Inventory,
    FreeSpace,
    RetentionDelete,
    ReclaimDelete,
    Archive,
    Dump,
}

#[derive(Error, Debug)]
#[error("{kind} failed: {source}")]
pub struct RunError {
    pub kind: FatalKind,
    #[source]
    pub source: Error,
}

impl RunError {
    pub fn new(kind: FatalKind, source: impl Into<Error>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub kind: RecoverableKind,
    pub path: Option<PathBuf>,
    pub message: String,
}

impl RunFailure {
    pub fn new(kind: RecoverableKind, path: Option<PathBuf>, message: impl fmt::Display) -> Self {
        Self {
            kind,
            path,
            message: message.to_string(),
        }
    }
}
