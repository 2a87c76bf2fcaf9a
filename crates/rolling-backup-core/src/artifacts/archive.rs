use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{Archiver, ARCHIVE_FILE_NAME};
use crate::error::Error;

/// Zips a directory tree with deflate, entries relative to the tree's root.
///
/// Links to files are stored with their target's contents. Links to
/// directories are not descended into.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn archive(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf, Error> {
        let dest = dest_dir.join(ARCHIVE_FILE_NAME);
        let mut zip = ZipWriter::new(BufWriter::new(File::create(&dest)?));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut files = 0usize;
        for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            let name = entry_name(source, entry.path());

            if entry.file_type().is_dir() {
                zip.add_directory(name, options)?;
                continue;
            }

            let metadata = if entry.path_is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        warn!("Not archiving dangling link {}: {}", entry.path().display(), err);
                        continue;
                    }
                }
            } else {
                entry.metadata().map_err(io::Error::from)?
            };

            if !metadata.is_file() {
                warn!("Not archiving {}: not a regular file", entry.path().display());
                continue;
            }

            // Entries past 4 GiB need ZIP64 headers.
            let file_options = options.large_file(metadata.len() >= u64::from(u32::MAX));
            zip.start_file(name, file_options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut zip)?;
            files += 1;
        }

        zip.finish()?;
        debug!("Archived {} files from {}", files, source.display());
        Ok(dest)
    }
}

/// Zip entry name for `path`: relative to `root`, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
