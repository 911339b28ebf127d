//! FileSystem trait for platform-agnostic read-only filesystem access.

use std::io;
use std::path::{Path, PathBuf};

/// Options for file discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Maximum file size to include (bytes).
    pub max_file_size: Option<u64>,

    /// Follow symbolic links (default: false).
    pub follow_symlinks: bool,

    /// Respect .gitignore files (default: true).
    pub respect_gitignore: bool,

    /// Directory names skipped outright regardless of ignore files.
    pub skip_dirs: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_file_size: Some(10 * 1024 * 1024),
            follow_symlinks: false,
            respect_gitignore: true,
            skip_dirs: vec!["node_modules".to_string(), ".git".to_string()],
        }
    }
}

/// Read-only filesystem abstraction.
///
/// All methods are async: native I/O is offloaded to a blocking thread pool
/// via `tokio::task::spawn_blocking`, and callers interleave cancellation
/// checks between awaits.
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Check if a path is a directory.
    async fn is_dir(&self, path: &Path) -> io::Result<bool>;

    /// Read file contents as a string.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::NotFound` if the file doesn't exist and
    /// `io::ErrorKind::InvalidData` if it is not valid UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Discover files under `root` whose names end with one of `suffixes`.
    ///
    /// Suffixes are matched against the file name (`.d.ts` matches
    /// `index.d.ts`), which extension-based matching cannot express. The
    /// result is sorted so downstream iteration is deterministic.
    async fn discover_files(
        &self,
        root: &Path,
        suffixes: &[&str],
        options: &DiscoveryOptions,
    ) -> io::Result<Vec<PathBuf>>;

    /// The root directory this filesystem was opened at.
    fn project_root(&self) -> &Path;
}
