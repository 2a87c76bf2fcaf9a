#[cfg(unix)]
pub mod unix;

use std::io;
use std::path::Path;

/// Source of the free space available on the filesystem holding a path.
pub trait FreeSpace: Send + Sync {
    fn free_bytes(&self, path: &Path) -> io::Result<u64>;
}

/// Free space as reported by `statvfs(3)` to unprivileged users.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatvfsFreeSpace;

#[cfg(unix)]
impl FreeSpace for StatvfsFreeSpace {
    fn free_bytes(&self, path: &Path) -> io::Result<u64> {
        unix::available_bytes(path)
    }
}

#[cfg(not(unix))]
impl FreeSpace for StatvfsFreeSpace {
    fn free_bytes(&self, path: &Path) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("free space query is not supported for {}", path.display()),
        ))
    }
}
