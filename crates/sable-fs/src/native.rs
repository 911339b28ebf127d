//! Native filesystem implementation using std::fs + tokio.

use crate::{DiscoveryOptions, FileSystem};
use ignore::WalkBuilder;
use std::io;
use std::path::{Path, PathBuf};
use tokio::task;

/// Native filesystem backed by `std::fs`, with blocking calls wrapped in
/// `tokio::task::spawn_blocking` so they don't stall the async runtime.
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    project_root: PathBuf,
}

impl NativeFileSystem {
    /// Create a filesystem rooted at `project_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root doesn't exist or is not a directory.
    pub fn new(project_root: impl AsRef<Path>) -> io::Result<Self> {
        let project_root = project_root.as_ref().canonicalize()?;
        if !project_root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", project_root.display()),
            ));
        }
        Ok(Self { project_root })
    }

    /// Resolve a possibly-relative path against the project root.
    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

#[async_trait::async_trait]
impl FileSystem for NativeFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let path = self.absolute(path);
        task::spawn_blocking(move || path.exists())
            .await
            .map_err(|e| io::Error::other(e.to_string()))
    }

    async fn is_dir(&self, path: &Path) -> io::Result<bool> {
        let path = self.absolute(path);
        task::spawn_blocking(move || path.is_dir())
            .await
            .map_err(|e| io::Error::other(e.to_string()))
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let path = self.absolute(path);
        task::spawn_blocking(move || std::fs::read_to_string(&path))
            .await
            .map_err(|e| io::Error::other(e.to_string()))?
    }

    async fn discover_files(
        &self,
        root: &Path,
        suffixes: &[&str],
        options: &DiscoveryOptions,
    ) -> io::Result<Vec<PathBuf>> {
        let root = self.absolute(root);
        let suffixes: Vec<String> = suffixes.iter().map(|s| s.to_string()).collect();
        let options = options.clone();

        task::spawn_blocking(move || {
            let mut builder = WalkBuilder::new(&root);
            builder
                .follow_links(options.follow_symlinks)
                .git_ignore(options.respect_gitignore)
                .git_global(false)
                .git_exclude(false)
                .hidden(true);

            let skip_dirs = options.skip_dirs.clone();
            builder.filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();
                !(entry.file_type().is_some_and(|t| t.is_dir())
                    && skip_dirs.iter().any(|d| d.as_str() == name))
            });

            let mut files = Vec::new();
            for entry in builder.build() {
                let Ok(entry) = entry else { continue };
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if !suffixes.iter().any(|s| name.ends_with(s.as_str())) {
                    continue;
                }
                if let Some(max) = options.max_file_size {
                    if entry.metadata().map(|m| m.len() > max).unwrap_or(false) {
                        continue;
                    }
                }
                files.push(entry.into_path());
            }

            files.sort();
            Ok(files)
        })
        .await
        .map_err(|e| io::Error::other(e.to_string()))?
    }

    fn project_root(&self) -> &Path {
        &self.project_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_read_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "package.json", "{\"name\":\"p\"}");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        assert!(fs.exists(Path::new("package.json")).await.unwrap());
        assert!(!fs.exists(Path::new("missing.json")).await.unwrap());

        let contents = fs.read_to_string(Path::new("package.json")).await.unwrap();
        assert_eq!(contents, "{\"name\":\"p\"}");
    }

    #[tokio::test]
    async fn test_discover_suffix_matching_and_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/b.ts", "");
        write(dir.path(), "src/a.ts", "");
        write(dir.path(), "src/types.d.ts", "");
        write(dir.path(), "src/ignore.js", "");
        write(dir.path(), "node_modules/pkg/index.ts", "");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let files = fs
            .discover_files(Path::new("."), &[".ts"], &DiscoveryOptions::default())
            .await
            .unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        // Sorted, node_modules skipped, `.ts` matches `.d.ts` too.
        assert_eq!(names, vec!["a.ts", "b.ts", "types.d.ts"]);
    }

    #[tokio::test]
    async fn test_discover_dts_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "dist/index.d.ts", "");
        write(dir.path(), "dist/index.js", "");
        write(dir.path(), "dist/util.ts", "");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let files = fs
            .discover_files(Path::new("dist"), &[".d.ts"], &DiscoveryOptions::default())
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("index.d.ts"));
    }
}
