use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

use super::{DatabaseDumper, DUMP_FILE_NAME};
use crate::config::DatabaseConfig;
use crate::error::Error;

/// Runs `mysqldump` (or the configured compatible program) and gzips its output.
///
/// The password travels in `MYSQL_PWD`, never on the command line. The call
/// blocks until the program exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlDumper;

impl MysqlDumper {
    fn command(database: &DatabaseConfig) -> Command {
        let mut cmd = Command::new(&database.dump_program);
        cmd.arg("-u")
            .arg(&database.user)
            .arg("-h")
            .arg(&database.host)
            .args(["-e", "--opt", "-c"])
            .arg(&database.name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !database.password.is_empty() {
            cmd.env("MYSQL_PWD", &database.password);
        }
        cmd
    }
}

impl DatabaseDumper for MysqlDumper {
    fn dump(&self, database: &DatabaseConfig, dest_dir: &Path) -> Result<PathBuf, Error> {
        let dest = dest_dir.join(DUMP_FILE_NAME);
        let mut encoder = GzEncoder::new(File::create(&dest)?, Compression::default());

        debug!("Running {} for database {}", database.dump_program, database.name);
        let mut child = Self::command(database).spawn()?;

        // Drained on its own thread so a chatty stderr can not stall stdout.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut captured = Vec::new();
                let _ = stderr.read_to_end(&mut captured);
                String::from_utf8_lossy(&captured).into_owned()
            })
        });
        let copied = match child.stdout.take() {
            Some(mut stdout) => io::copy(&mut stdout, &mut encoder),
            None => Err(io::Error::new(io::ErrorKind::Other, "dump program has no stdout")),
        };
        let status = child.wait()?;
        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        let bytes = copied?;
        encoder.finish()?;

        if !status.success() {
            return Err(Error::Dump {
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            debug!("{} reported: {}", database.dump_program, stderr.trim());
        }
        debug!("Dumped {} bytes of {} to {}", bytes, database.name, dest.display());
        Ok(dest)
    }
}
