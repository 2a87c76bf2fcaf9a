pub mod artifacts;
pub mod config;
pub mod engine;
pub mod error;
pub mod platform;
pub mod policy;
pub mod progress;
pub mod runlog;
pub mod scanner;

pub use config::AppConfig;
pub use engine::{BackupEngine, RunReport, SpaceBudget, Stage};
pub use error::{Error, FatalKind, RecoverableKind, RunError, RunFailure};
pub use progress::{ProgressReporter, SilentReporter};
