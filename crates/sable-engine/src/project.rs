//! Project loading: enumerate, parse, and lower the package's files.
//!
//! This is the engine's compiler adapter. Files are parsed once, lowered to
//! [`FileIr`], and the ASTs dropped; everything downstream works off the
//! owned IR. Malformed files never abort a run — they surface as warnings.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use sable_core::diag::codes;
use sable_core::{ExtractMode, Result};
use sable_fs::{DiscoveryOptions, FileSystem};

use crate::context::ExtractionContext;
use crate::ir::FileIr;
use crate::lower::lower_source;

/// Extensions stripped when deriving module names, longest first.
const MODULE_EXTENSIONS: &[&str] = &[
    ".d.mts", ".d.cts", ".d.ts", ".tsx", ".mts", ".cts", ".ts", ".mjs", ".cjs", ".js",
];

/// Candidate extensions for resolving extensionless relative imports.
const SOURCE_CANDIDATES: &[&str] = &[".ts", ".tsx", ".mts", ".d.ts", ".d.mts", ".d.cts"];
const COMPILED_CANDIDATES: &[&str] = &[".d.ts", ".d.mts", ".d.cts", ".ts", ".tsx", ".mts"];

/// The set of lowered files for one extraction run.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    mode: ExtractMode,
    files: BTreeMap<PathBuf, Arc<FileIr>>,
}

impl Project {
    /// Enumerate and lower every project file for `mode`.
    pub async fn load<F: FileSystem>(
        fs: &F,
        root: &Path,
        mode: ExtractMode,
        declarations_root: Option<&Path>,
        ctx: &mut ExtractionContext,
    ) -> Result<Self> {
        let scan_root = match mode {
            ExtractMode::Source => root.to_path_buf(),
            ExtractMode::Compiled => declarations_root
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
        };
        let suffixes: &[&str] = match mode {
            ExtractMode::Source => &[".ts", ".tsx", ".mts"],
            ExtractMode::Compiled => &[".d.ts", ".d.mts", ".d.cts"],
        };

        ctx.cancel.check()?;
        let mut discovered = fs
            .discover_files(&scan_root, suffixes, &DiscoveryOptions::default())
            .await?;
        if mode == ExtractMode::Source {
            // `.d.ts` ends with `.ts`; declarations belong to compiled mode.
            discovered.retain(|p| {
                let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
                !name.ends_with(".d.ts") && !name.ends_with(".d.mts") && !name.ends_with(".d.cts")
            });
        }

        let mut project = Self {
            root: scan_root,
            mode,
            files: BTreeMap::new(),
        };
        for path in discovered {
            ctx.cancel.check()?;
            project.add_file(fs, &path, ctx).await?;
        }
        tracing::debug!(files = project.files.len(), "project loaded");
        Ok(project)
    }

    pub fn mode(&self) -> ExtractMode {
        self.mode
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parse and lower one file if it is not already in the project. Used by
    /// the dependency resolver to pull declaration files in lazily.
    pub async fn add_file<F: FileSystem>(
        &mut self,
        fs: &F,
        path: &Path,
        ctx: &mut ExtractionContext,
    ) -> Result<Option<Arc<FileIr>>> {
        let path = normalize_path(path);
        if let Some(existing) = self.files.get(&path) {
            return Ok(Some(existing.clone()));
        }

        ctx.cancel.check()?;
        let source = match fs.read_to_string(&path).await {
            Ok(source) => source,
            Err(err) => {
                ctx.warn(
                    codes::PARSE_FAILED,
                    format!("cannot read {}: {err}", path.display()),
                );
                return Ok(None);
            }
        };

        match lower_source(&source, &path, self.module_name_for(&path)) {
            Ok(ir) => {
                let ir = Arc::new(ir);
                self.files.insert(path, ir.clone());
                Ok(Some(ir))
            }
            Err(reason) => {
                ctx.warn(
                    codes::PARSE_FAILED,
                    format!("cannot parse {}: {reason}", path.display()),
                );
                Ok(None)
            }
        }
    }

    /// Relative module name (no extension) for a file path.
    pub fn module_name_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut name = relative.to_string_lossy().replace('\\', "/");
        for ext in MODULE_EXTENSIONS {
            if let Some(stripped) = name.strip_suffix(ext) {
                name = stripped.to_string();
                break;
            }
        }
        name
    }

    pub fn file(&self, path: &Path) -> Option<&Arc<FileIr>> {
        self.files.get(&normalize_path(path))
    }

    /// Files in deterministic (path) order.
    pub fn files(&self) -> impl Iterator<Item = &Arc<FileIr>> {
        self.files.values()
    }

    /// Resolve a relative import/re-export specifier against the loaded set.
    pub fn resolve_module(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        if !specifier.starts_with('.') {
            return None;
        }
        let base = from.parent()?.join(specifier);
        let base = normalize_path(&base);

        if self.files.contains_key(&base) {
            return Some(base);
        }

        let candidates = match self.mode {
            ExtractMode::Source => SOURCE_CANDIDATES,
            ExtractMode::Compiled => COMPILED_CANDIDATES,
        };

        let base_str = base.to_string_lossy().to_string();
        // Compiled output imports name `.js` files; swap the extension.
        let stripped = base_str
            .strip_suffix(".js")
            .or_else(|| base_str.strip_suffix(".mjs"))
            .or_else(|| base_str.strip_suffix(".cjs"))
            .unwrap_or(&base_str);

        for ext in candidates {
            let candidate = PathBuf::from(format!("{stripped}{ext}"));
            if self.files.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        for ext in candidates {
            let candidate = base.join(format!("index{ext}"));
            if self.files.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

/// Lexical path normalization (`a/./b/../c` -> `a/c`). Canonicalization is
/// avoided so unloaded paths normalize the same way as loaded ones.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_fs::NativeFileSystem;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./../c/d.ts")),
            PathBuf::from("/a/c/d.ts")
        );
    }

    #[tokio::test]
    async fn test_load_source_mode_skips_declarations() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "export class A {}");
        write(dir.path(), "src/types.d.ts", "export interface Hidden {}");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let mut ctx = ExtractionContext::default();
        let project = Project::load(&fs, fs.project_root(), ExtractMode::Source, None, &mut ctx)
            .await
            .unwrap();

        let names: Vec<String> = project.files().map(|f| f.module_name.clone()).collect();
        assert_eq!(names, vec!["src/index".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_relative_import() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "export * from \"./models\";");
        write(dir.path(), "src/models.ts", "export interface M {}");
        write(dir.path(), "src/util/index.ts", "export function u(): void {}");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let mut ctx = ExtractionContext::default();
        let project = Project::load(&fs, fs.project_root(), ExtractMode::Source, None, &mut ctx)
            .await
            .unwrap();

        let index = fs.project_root().join("src/index.ts");
        let models = project.resolve_module(&index, "./models").unwrap();
        assert!(models.ends_with("src/models.ts"));

        let util = project.resolve_module(&index, "./util").unwrap();
        assert!(util.ends_with("src/util/index.ts"));

        assert!(project.resolve_module(&index, "some-package").is_none());
    }

    #[tokio::test]
    async fn test_compiled_mode_resolves_js_specifiers() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "dist/index.d.ts", "export * from \"./models.js\";");
        write(dir.path(), "dist/models.d.ts", "export interface M {}");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let mut ctx = ExtractionContext::default();
        let project = Project::load(&fs, fs.project_root(), ExtractMode::Compiled, None, &mut ctx)
            .await
            .unwrap();

        let index = fs.project_root().join("dist/index.d.ts");
        let models = project.resolve_module(&index, "./models.js").unwrap();
        assert!(models.ends_with("dist/models.d.ts"));
    }

    #[tokio::test]
    async fn test_malformed_file_warns_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/good.ts", "export class Good {}");
        write(dir.path(), "src/bad.ts", "export class {{{{");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let mut ctx = ExtractionContext::default();
        let project = Project::load(&fs, fs.project_root(), ExtractMode::Source, None, &mut ctx)
            .await
            .unwrap();

        // The good file always loads; the bad one either recovers or warns.
        assert!(project
            .files()
            .any(|f| f.module_name == "src/good"));
    }
}
