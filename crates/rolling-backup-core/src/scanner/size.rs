use std::io;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// Total size in bytes of everything under `path`.
///
/// Links are not followed: a symlink contributes the size of the link entry
/// itself, never its target. An unreadable `path` is an error; unreadable
/// entries below it are logged and skipped.
pub fn directory_size(path: &Path) -> io::Result<u64> {
    let root_metadata = path.symlink_metadata()?;
    if !root_metadata.is_dir() {
        return Ok(root_metadata.len());
    }

    let mut total = 0u64;
    for entry in WalkDir::new(path).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {}", path.display(), err);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => total += metadata.len(),
            Err(err) => warn!(
                "Skipping {} while measuring {}: {}",
                entry.path().display(),
                path.display(),
                err
            ),
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sums_nested_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top.bin"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("a/mid.bin"), vec![0u8; 250]).unwrap();
        fs::write(dir.path().join("a/b/deep.bin"), vec![0u8; 7]).unwrap();

        assert_eq!(directory_size(dir.path()).unwrap(), 357);
    }

    #[test]
    fn test_empty_directory_is_zero() {
        let dir = tempdir().unwrap();
        assert_eq!(directory_size(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(directory_size(&dir.path().join("missing")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let target = tempdir().unwrap();
        fs::write(target.path().join("big.bin"), vec![0u8; 10_000]).unwrap();

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("small.bin"), vec![0u8; 10]).unwrap();
        std::os::unix::fs::symlink(target.path(), dir.path().join("link")).unwrap();

        let link_len = fs::symlink_metadata(dir.path().join("link")).unwrap().len();
        assert_eq!(directory_size(dir.path()).unwrap(), 10 + link_len);
    }
}
