//! Export resolution: map flattened export entries to files, then assign
//! each exported symbol its `(exportPath, condition)` using declaration-site
//! semantics.
//!
//! Phase 1 claims symbols declared inside an entry file itself (iterating
//! entries in sorted order, so the most specific declared condition wins) and
//! records external re-exports. Phase 2 walks local re-export chains and
//! claims symbols declared elsewhere only if still unclaimed: a symbol's
//! condition comes from where it is declared, not where it happens to be
//! re-exported.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use sable_core::condition::condition_priority;
use sable_core::{ExtractMode, Result};
use sable_fs::FileSystem;

use crate::context::ExtractionContext;
use crate::manifest::{flatten_exports, ExportEntry, PackageManifest};
use crate::project::{normalize_path, Project};

/// An export entry resolved to a concrete declaration file.
#[derive(Debug, Clone)]
pub struct ResolvedExport {
    pub entry: ExportEntry,
    pub file: PathBuf,
}

/// The `(exportPath, condition)` a symbol was claimed under.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolAssignment {
    pub export_path: String,
    pub condition: String,
    pub condition_chain: Vec<String>,
}

/// `export { X } from "pkg"` at an entry file.
#[derive(Debug, Clone)]
pub struct ExternalReexport {
    pub package: String,
    /// Name inside the source package.
    pub local_name: String,
    /// Name as re-exported.
    pub exported_name: String,
    /// Entry file containing the re-export.
    pub from_file: PathBuf,
    pub assignment: SymbolAssignment,
}

/// Module-level export metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleMeta {
    /// Most-general condition under which the module is reachable.
    pub condition: String,
    /// Chain for directly exported modules.
    pub condition_chain: Option<Vec<String>>,
    /// Subpath for directly exported modules.
    pub export_path: Option<String>,
}

/// Everything the rest of the pipeline needs from export resolution.
#[derive(Debug, Default)]
pub struct ExportResolution {
    pub entries: Vec<ResolvedExport>,
    /// Declaration-site claims: `(file, symbol)` -> assignment.
    pub assignments: FxHashMap<(PathBuf, String), SymbolAssignment>,
    pub external_reexports: Vec<ExternalReexport>,
    pub module_meta: BTreeMap<PathBuf, ModuleMeta>,
}

/// Resolve the manifest's export surface against the project.
pub async fn resolve_exports<F: FileSystem>(
    fs: &F,
    project: &mut Project,
    manifest: &PackageManifest,
    package_root: &Path,
    declarations_root: Option<&Path>,
    ctx: &mut ExtractionContext,
) -> Result<ExportResolution> {
    let mut resolution = ExportResolution::default();

    for entry in flatten_exports(manifest) {
        ctx.cancel.check()?;
        let resolved = resolve_entry_file(
            fs,
            package_root,
            declarations_root,
            project.mode(),
            &entry.target,
        )
        .await?;
        match resolved {
            Some(file) => {
                project.add_file(fs, &file, ctx).await?;
                resolution.entries.push(ResolvedExport { entry, file });
            }
            None => {
                tracing::debug!(target = %entry.target, "export target did not resolve");
            }
        }
    }

    assign_symbols(project, &mut resolution);
    propagate_module_conditions(project, &mut resolution);
    Ok(resolution)
}

fn assign_symbols(project: &Project, resolution: &mut ExportResolution) {
    // Phase 1: symbols declared inside the entry file itself. Entries are
    // iterated in sorted order and overwrite, so the most specific declared
    // condition ends up owning the symbol.
    for resolved in &resolution.entries {
        let Some(file_ir) = project.file(&resolved.file) else {
            continue;
        };
        let assignment = SymbolAssignment {
            export_path: resolved.entry.export_path.clone(),
            condition: resolved.entry.condition.clone(),
            condition_chain: resolved.entry.condition_chain.clone(),
        };

        for name in file_ir.exported_local_names() {
            resolution
                .assignments
                .insert((resolved.file.clone(), name), assignment.clone());
        }

        for reexport in &file_ir.reexports {
            if !reexport.is_bare() {
                continue;
            }
            let package = package_of_specifier(&reexport.source);
            for (local, exported) in &reexport.names {
                resolution.external_reexports.push(ExternalReexport {
                    package: package.clone(),
                    local_name: local.clone(),
                    exported_name: exported.clone(),
                    from_file: resolved.file.clone(),
                    assignment: assignment.clone(),
                });
            }
        }

        // Module metadata: the most general condition wins.
        update_module_meta(
            &mut resolution.module_meta,
            &resolved.file,
            &resolved.entry,
        );
    }

    // Phase 2: symbols re-exported from non-entry files get the entry's
    // assignment only if unclaimed.
    for resolved in &resolution.entries {
        let assignment = SymbolAssignment {
            export_path: resolved.entry.export_path.clone(),
            condition: resolved.entry.condition.clone(),
            condition_chain: resolved.entry.condition_chain.clone(),
        };

        let mut queue = vec![resolved.file.clone()];
        let mut visited: Vec<PathBuf> = Vec::new();
        while let Some(file_path) = queue.pop() {
            if visited.contains(&file_path) {
                continue;
            }
            visited.push(file_path.clone());
            let Some(file_ir) = project.file(&file_path) else {
                continue;
            };

            for reexport in &file_ir.reexports {
                if reexport.is_bare() {
                    continue;
                }
                let Some(target) = project.resolve_module(&file_path, &reexport.source) else {
                    continue;
                };
                let Some(target_ir) = project.file(&target) else {
                    continue;
                };

                if reexport.is_star {
                    for name in target_ir.exported_local_names() {
                        resolution
                            .assignments
                            .entry((target.clone(), name))
                            .or_insert_with(|| assignment.clone());
                    }
                } else {
                    for (local, _exported) in &reexport.names {
                        if target_ir.exports_name(local) {
                            resolution
                                .assignments
                                .entry((target.clone(), local.clone()))
                                .or_insert_with(|| assignment.clone());
                        }
                    }
                }
                queue.push(target);
            }
        }
    }
}

fn update_module_meta(
    meta: &mut BTreeMap<PathBuf, ModuleMeta>,
    file: &Path,
    entry: &ExportEntry,
) {
    let new_meta = || ModuleMeta {
        condition: entry.condition.clone(),
        condition_chain: if entry.condition_chain.is_empty() {
            None
        } else {
            Some(entry.condition_chain.clone())
        },
        export_path: Some(entry.export_path.clone()),
    };

    match meta.get_mut(file) {
        Some(existing) => {
            if condition_priority(&entry.condition) < condition_priority(&existing.condition) {
                *existing = new_meta();
            }
        }
        None => {
            meta.insert(file.to_path_buf(), new_meta());
        }
    }
}

/// Modules not in the export map inherit the most general condition of the
/// entry modules that transitively reference them.
fn propagate_module_conditions(project: &Project, resolution: &mut ExportResolution) {
    for resolved in &resolution.entries {
        let condition = resolved.entry.condition.clone();
        let mut queue = vec![resolved.file.clone()];
        let mut visited: Vec<PathBuf> = Vec::new();

        while let Some(file_path) = queue.pop() {
            if visited.contains(&file_path) {
                continue;
            }
            visited.push(file_path.clone());
            let Some(file_ir) = project.file(&file_path) else {
                continue;
            };

            let mut neighbors: Vec<PathBuf> = Vec::new();
            for import in &file_ir.imports {
                if let Some(target) = project.resolve_module(&file_path, &import.source) {
                    neighbors.push(target);
                }
            }
            for reexport in &file_ir.reexports {
                if !reexport.is_bare() {
                    if let Some(target) = project.resolve_module(&file_path, &reexport.source) {
                        neighbors.push(target);
                    }
                }
            }

            for neighbor in neighbors {
                match resolution.module_meta.get_mut(&neighbor) {
                    Some(meta) if meta.export_path.is_none() => {
                        if condition_priority(&condition) < condition_priority(&meta.condition) {
                            meta.condition = condition.clone();
                        }
                    }
                    Some(_) => {}
                    None => {
                        resolution.module_meta.insert(
                            neighbor.clone(),
                            ModuleMeta {
                                condition: condition.clone(),
                                condition_chain: None,
                                export_path: None,
                            },
                        );
                    }
                }
                queue.push(neighbor);
            }
        }
    }
}

/// Package name of a bare specifier (`@scope/pkg/sub` -> `@scope/pkg`).
pub fn package_of_specifier(specifier: &str) -> String {
    let mut segments = specifier.split('/');
    match segments.next() {
        Some(scope) if scope.starts_with('@') => match segments.next() {
            Some(name) => format!("{scope}/{name}"),
            None => scope.to_string(),
        },
        Some(name) => name.to_string(),
        None => specifier.to_string(),
    }
}

/// Resolve one export target to an on-disk declaration or source file.
pub async fn resolve_entry_file<F: FileSystem>(
    fs: &F,
    package_root: &Path,
    declarations_root: Option<&Path>,
    mode: ExtractMode,
    target: &str,
) -> Result<Option<PathBuf>> {
    let relative = target.trim_start_matches("./");
    let mut candidates: Vec<String> = Vec::new();

    match mode {
        ExtractMode::Source => {
            candidates.push(relative.to_string());
            if let Some(swapped) = swap_to_source_ext(relative) {
                candidates.push(swapped);
            }
            // Published targets point at build output; remap conventional
            // output directories back onto the source tree.
            let existing = candidates.clone();
            for candidate in existing {
                if let Some(remapped) = remap_output_dir(&candidate) {
                    candidates.push(remapped);
                }
            }
        }
        ExtractMode::Compiled => {
            if relative.ends_with(".d.ts")
                || relative.ends_with(".d.mts")
                || relative.ends_with(".d.cts")
            {
                candidates.push(relative.to_string());
            }
            if let Some(swapped) = swap_to_declaration_ext(relative) {
                candidates.push(swapped);
            }
        }
    }

    let mut roots: Vec<&Path> = vec![package_root];
    if let Some(dts_root) = declarations_root {
        roots.push(dts_root);
    }

    for root in roots {
        for candidate in &candidates {
            let path = normalize_path(&root.join(candidate));
            if fs.exists(&path).await? {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}

/// `.js -> .ts`, `.mjs -> .mts`, `.cjs -> .cts`, `.d.ts -> .ts`.
fn swap_to_source_ext(target: &str) -> Option<String> {
    if let Some(stem) = target.strip_suffix(".d.ts") {
        return Some(format!("{stem}.ts"));
    }
    if let Some(stem) = target.strip_suffix(".mjs") {
        return Some(format!("{stem}.mts"));
    }
    if let Some(stem) = target.strip_suffix(".cjs") {
        return Some(format!("{stem}.cts"));
    }
    if let Some(stem) = target.strip_suffix(".js") {
        return Some(format!("{stem}.ts"));
    }
    None
}

/// `.js -> .d.ts` and friends; plain `.ts` targets publish as `.d.ts`.
fn swap_to_declaration_ext(target: &str) -> Option<String> {
    if let Some(stem) = target.strip_suffix(".mjs") {
        return Some(format!("{stem}.d.mts"));
    }
    if let Some(stem) = target.strip_suffix(".cjs") {
        return Some(format!("{stem}.d.cts"));
    }
    if let Some(stem) = target.strip_suffix(".js") {
        return Some(format!("{stem}.d.ts"));
    }
    if target.ends_with(".d.ts") || target.ends_with(".d.mts") || target.ends_with(".d.cts") {
        return None;
    }
    if let Some(stem) = target.strip_suffix(".ts") {
        return Some(format!("{stem}.d.ts"));
    }
    None
}

/// `dist/... -> src/...` for the conventional output directory names.
fn remap_output_dir(target: &str) -> Option<String> {
    for dir in ["dist", "lib", "build", "out", "esm", "cjs"] {
        if let Some(rest) = target.strip_prefix(&format!("{dir}/")) {
            return Some(format!("src/{rest}"));
        }
    }
    None
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

    async fn resolve(
        fs: &NativeFileSystem,
        manifest_json: &str,
        mode: ExtractMode,
    ) -> (Project, ExportResolution) {
        let mut ctx = ExtractionContext::default();
        let mut project = Project::load(fs, fs.project_root(), mode, None, &mut ctx)
            .await
            .unwrap();
        let manifest = crate::manifest::PackageManifest::parse(
            manifest_json,
            &fs.project_root().join("package.json"),
        )
        .unwrap();
        let resolution = resolve_exports(
            fs,
            &mut project,
            &manifest,
            fs.project_root(),
            None,
            &mut ctx,
        )
        .await
        .unwrap();
        (project, resolution)
    }

    #[tokio::test]
    async fn test_declaration_site_assignment_phases() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/index.ts",
            "export class A {}\nexport { B } from \"./extra\";\n",
        );
        write(dir.path(), "src/extra.ts", "export class B {}\n");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let (_, resolution) = resolve(
            &fs,
            r#"{ "name": "pkg", "exports": { ".": "./src/index.ts" } }"#,
            ExtractMode::Source,
        )
        .await;

        let index_file = fs.project_root().join("src/index.ts");
        let extra_file = fs.project_root().join("src/extra.ts");

        // Phase 1: declared in the entry file itself.
        let a = resolution
            .assignments
            .get(&(index_file.clone(), "A".to_string()))
            .unwrap();
        assert_eq!(a.export_path, ".");
        assert_eq!(a.condition, "default");

        // Phase 2: declared elsewhere, claimed through the re-export chain.
        let b = resolution
            .assignments
            .get(&(extra_file.clone(), "B".to_string()))
            .unwrap();
        assert_eq!(b.export_path, ".");

        // The non-entry module inherits the entry's condition.
        let extra_meta = resolution.module_meta.get(&extra_file).unwrap();
        assert_eq!(extra_meta.condition, "default");
        assert!(extra_meta.export_path.is_none());
    }

    #[tokio::test]
    async fn test_most_specific_condition_claims_symbol() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "export class C {}\n");

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let (_, resolution) = resolve(
            &fs,
            r#"{
  "name": "pkg",
  "exports": { ".": { "types": "./src/index.ts", "import": "./src/index.ts" } }
}"#,
            ExtractMode::Source,
        )
        .await;

        let index_file = fs.project_root().join("src/index.ts");

        // The symbol takes the most specific declared condition...
        let c = resolution
            .assignments
            .get(&(index_file.clone(), "C".to_string()))
            .unwrap();
        assert_eq!(c.condition, "import");

        // ...while the module keeps the most general one.
        let meta = resolution.module_meta.get(&index_file).unwrap();
        assert_eq!(meta.condition, "types");
    }

    #[tokio::test]
    async fn test_star_reexport_claims_all_names() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "export * from \"./models\";\n");
        write(
            dir.path(),
            "src/models.ts",
            "export interface M1 {}\nexport interface M2 {}\n",
        );

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let (_, resolution) = resolve(
            &fs,
            r#"{ "name": "pkg", "exports": { ".": "./src/index.ts" } }"#,
            ExtractMode::Source,
        )
        .await;

        let models = fs.project_root().join("src/models.ts");
        assert!(resolution
            .assignments
            .contains_key(&(models.clone(), "M1".to_string())));
        assert!(resolution
            .assignments
            .contains_key(&(models, "M2".to_string())));
    }

    #[tokio::test]
    async fn test_external_reexport_recorded() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/index.ts",
            "export { RestError } from \"@core/rest\";\n",
        );

        let fs = NativeFileSystem::new(dir.path()).unwrap();
        let (_, resolution) = resolve(
            &fs,
            r#"{ "name": "pkg", "exports": { ".": "./src/index.ts" } }"#,
            ExtractMode::Source,
        )
        .await;

        assert_eq!(resolution.external_reexports.len(), 1);
        let reexport = &resolution.external_reexports[0];
        assert_eq!(reexport.package, "@core/rest");
        assert_eq!(reexport.local_name, "RestError");
        assert_eq!(reexport.assignment.export_path, ".");
    }

    #[test]
    fn test_package_of_specifier() {
        assert_eq!(package_of_specifier("react"), "react");
        assert_eq!(package_of_specifier("lodash/merge"), "lodash");
        assert_eq!(package_of_specifier("@azure/core-http"), "@azure/core-http");
        assert_eq!(
            package_of_specifier("@azure/core-http/policies"),
            "@azure/core-http"
        );
    }

    #[test]
    fn test_extension_swaps() {
        assert_eq!(swap_to_source_ext("dist/index.js").as_deref(), Some("dist/index.ts"));
        assert_eq!(swap_to_source_ext("dist/index.d.ts").as_deref(), Some("dist/index.ts"));
        assert_eq!(swap_to_source_ext("a.mjs").as_deref(), Some("a.mts"));
        assert_eq!(swap_to_source_ext("a.ts"), None);

        assert_eq!(
            swap_to_declaration_ext("dist/index.js").as_deref(),
            Some("dist/index.d.ts")
        );
        assert_eq!(swap_to_declaration_ext("dist/index.d.ts"), None);
    }

    #[test]
    fn test_output_dir_remap() {
        assert_eq!(remap_output_dir("dist/index.ts").as_deref(), Some("src/index.ts"));
        assert_eq!(remap_output_dir("lib/a/b.ts").as_deref(), Some("src/a/b.ts"));
        assert_eq!(remap_output_dir("src/index.ts"), None);
    }
}
