use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::Dispatch;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Error;

/// Log file dedicated to a single backup run.
///
/// Events are captured only while inside [`RunLog::in_scope`]. A run that
/// logged nothing leaves no file behind once [`RunLog::finish`] is called.
pub struct RunLog {
    path: PathBuf,
    dispatch: Dispatch,
}

impl RunLog {
    /// Create `log_root` and the empty file `<log_root>/<file_name>`.
    pub fn open(log_root: &Path, file_name: &str, level: &str, console: bool) -> Result<Self, Error> {
        fs::create_dir_all(log_root)?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name)
            .build(log_root)
            .map_err(|e| Error::Other(format!("Can not open log file in {}: {}", log_root.display(), e)))?;

        let file_layer = fmt::layer()
            .with_writer(appender)
            .with_ansi(false)
            .with_filter(level_filter(level)?);

        let console_layer = if console {
            Some(
                fmt::layer()
                    .with_writer(io::stdout)
                    .without_time()
                    .with_target(false)
                    .with_filter(level_filter(level)?),
            )
        } else {
            None
        };

        let subscriber = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);

        Ok(Self {
            path: log_root.join(file_name),
            dispatch: Dispatch::new(subscriber),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` with this log as the current thread's default subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Close the log, deleting the file if nothing was written to it.
    ///
    /// Returns whether the file was kept.
    pub fn finish(self) -> io::Result<bool> {
        let RunLog { path, dispatch } = self;
        drop(dispatch);

        if fs::metadata(&path)?.len() == 0 {
            fs::remove_file(&path)?;
            Ok(false)
        } else {
            Ok(true)
        }
    }
}

fn level_filter(level: &str) -> Result<EnvFilter, Error> {
    EnvFilter::try_new(level).map_err(|e| Error::Other(format!("Invalid log level '{}': {}", level, e)))
}
