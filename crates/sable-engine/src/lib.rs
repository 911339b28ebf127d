//! Sable Engine - TypeScript API-surface extraction.
//!
//! The pipeline, in order:
//!
//! 1. Read the package manifest ([`manifest`])
//! 2. Load and lower the project's files ([`project`], [`lower`])
//! 3. Resolve the export map and assign entry-point symbols ([`exports`])
//! 4. Extract entities with their type references ([`extract`], [`collector`])
//! 5. Prune to the reachability closure ([`reachability`])
//! 6. Expand external dependencies to a fixed point ([`deps`])
//! 7. Assemble: IDs, cross-language join, diagnostics ([`assemble`])
//!
//! Each run owns an [`context::ExtractionContext`]; nothing semantic is
//! shared between runs. Fatal conditions abort with no partial output, and
//! everything recoverable becomes a diagnostic on the final graph.

pub mod assemble;
pub mod builtins;
pub mod collector;
pub mod context;
pub mod deps;
pub mod exports;
pub mod extract;
pub mod ir;
pub mod lower;
pub mod manifest;
pub mod project;
pub mod reachability;

use std::path::{Path, PathBuf};

use sable_core::{ApiIndex, Error, ExtractOptions, ModuleInfo, Result};
use sable_fs::{FileSystem, NativeFileSystem};

use crate::builtins::BuiltinClassifier;
use crate::context::ExtractionContext;
use crate::extract::{extract_module, EntityRecord};
use crate::manifest::PackageManifest;
use crate::project::Project;

/// Run one extraction against the given filesystem.
pub async fn extract<F: FileSystem>(fs: &F, options: ExtractOptions) -> Result<ApiIndex> {
    let mut ctx = ExtractionContext::new(options.cancel.clone());

    let root = options.root.clone();
    if !fs.is_dir(&root).await? {
        return Err(Error::InputInvalid {
            path: root,
            reason: "package root is not a directory".to_string(),
        });
    }
    if let Some(dts_root) = &options.declarations_root {
        if !fs.is_dir(dts_root).await? {
            return Err(Error::InputInvalid {
                path: dts_root.clone(),
                reason: "declarations root is not a directory".to_string(),
            });
        }
    }

    // Manifest.
    let manifest_path = options
        .manifest_path
        .clone()
        .unwrap_or_else(|| root.join("package.json"));
    ctx.cancel.check()?;
    let manifest_text = fs
        .read_to_string(&manifest_path)
        .await
        .map_err(|err| Error::InputInvalid {
            path: manifest_path.clone(),
            reason: format!("cannot read manifest: {err}"),
        })?;
    let manifest = PackageManifest::parse(&manifest_text, &manifest_path)?;
    let package_name = if manifest.name.is_empty() {
        root.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "package".to_string())
    } else {
        manifest.name.clone()
    };
    tracing::debug!(package = %package_name, mode = ?options.mode, "starting extraction");

    // Project load + builtin discovery from bundled lib files.
    let mut project = Project::load(
        fs,
        &root,
        options.mode,
        options.declarations_root.as_deref(),
        &mut ctx,
    )
    .await?;
    let mut builtins = BuiltinClassifier::new();
    let mut lib_files: Vec<PathBuf> = Vec::new();
    for file in project.files() {
        let name = file
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        if BuiltinClassifier::is_lib_file(name) {
            lib_files.push(file.path.clone());
            for decl in &file.decls {
                builtins.discover(decl.name());
            }
        }
    }

    // Export resolution.
    let resolution = exports::resolve_exports(
        fs,
        &mut project,
        &manifest,
        &root,
        options.declarations_root.as_deref(),
        &mut ctx,
    )
    .await?;

    // Entity extraction per file.
    let mut modules: Vec<ModuleInfo> = Vec::new();
    for file in project.files().cloned().collect::<Vec<_>>() {
        ctx.cancel.check()?;
        if lib_files.contains(&file.path) {
            continue;
        }
        let mut module = extract_module(&file, &builtins);

        if let Some(meta) = resolution.module_meta.get(&file.path) {
            module.condition = Some(meta.condition.clone());
            module.condition_chain = meta.condition_chain.clone();
            module.export_path = meta.export_path.clone();
        }

        apply_assignments(&mut module, &file.path, &resolution);
        modules.push(module);
    }

    // Reachability pruning.
    let reachable = reachability::compute_reachable(&modules);
    let mut modules = reachability::filter_modules(modules, &reachable);

    // Dependency expansion.
    let dep_resolution = deps::resolve_dependencies(
        fs,
        &mut project,
        &root,
        &package_name,
        &modules,
        &resolution.external_reexports,
        &builtins,
        &mut ctx,
    )
    .await?;

    // Entities re-exported from external packages live in the re-exporting
    // entry module.
    for (reexport, record) in dep_resolution.reexported {
        place_reexported_entity(&mut modules, &project, &reexport, record, &resolution);
    }

    let mut index = ApiIndex {
        package: package_name,
        version: manifest.version.clone(),
        modules,
        dependencies: if dep_resolution.dependencies.is_empty() {
            None
        } else {
            Some(dep_resolution.dependencies)
        },
        ..Default::default()
    };

    assemble::assemble(&mut index, options.cross_language_map.as_ref(), &ctx);
    Ok(index)
}

/// Tag entry-point entities with their `(exportPath, condition)` claims.
fn apply_assignments(
    module: &mut ModuleInfo,
    file_path: &Path,
    resolution: &exports::ExportResolution,
) {
    let claim = |name: &str| {
        resolution
            .assignments
            .get(&(file_path.to_path_buf(), name.to_string()))
    };

    for class in module.classes.iter_mut().flatten() {
        if let Some(assignment) = claim(&class.name) {
            class.entry_point = Some(true);
            class.export_path = Some(assignment.export_path.clone());
        }
    }
    for iface in module.interfaces.iter_mut().flatten() {
        if let Some(assignment) = claim(&iface.name) {
            iface.entry_point = Some(true);
            iface.export_path = Some(assignment.export_path.clone());
        }
    }
    for en in module.enums.iter_mut().flatten() {
        if let Some(assignment) = claim(&en.name) {
            en.entry_point = Some(true);
            en.export_path = Some(assignment.export_path.clone());
        }
    }
    for alias in module.types.iter_mut().flatten() {
        if let Some(assignment) = claim(&alias.name) {
            alias.entry_point = Some(true);
            alias.export_path = Some(assignment.export_path.clone());
        }
    }
    for func in module.functions.iter_mut().flatten() {
        if let Some(assignment) = claim(&func.name) {
            func.entry_point = Some(true);
            func.export_path = Some(assignment.export_path.clone());
        }
    }
}

/// Insert an externally re-exported entity into the module that re-exported
/// it, tagged with `reExportedFrom` and its entry-point claim.
fn place_reexported_entity(
    modules: &mut Vec<ModuleInfo>,
    project: &Project,
    reexport: &exports::ExternalReexport,
    record: EntityRecord,
    resolution: &exports::ExportResolution,
) {
    let module_name = project.module_name_for(&reexport.from_file);
    let index = match modules.iter().position(|m| m.name == module_name) {
        Some(index) => index,
        None => {
            let mut module = ModuleInfo {
                name: module_name,
                ..Default::default()
            };
            if let Some(meta) = resolution.module_meta.get(&reexport.from_file) {
                module.condition = Some(meta.condition.clone());
                module.condition_chain = meta.condition_chain.clone();
                module.export_path = meta.export_path.clone();
            }
            modules.push(module);
            modules.len() - 1
        }
    };
    let module = &mut modules[index];

    let name = reexport.exported_name.clone();
    let export_path = Some(reexport.assignment.export_path.clone());
    let from = Some(reexport.package.clone());

    match record {
        EntityRecord::Class(mut class) => {
            class.name = name;
            class.entry_point = Some(true);
            class.export_path = export_path;
            class.re_exported_from = from;
            module.classes.get_or_insert_with(Vec::new).push(class);
        }
        EntityRecord::Interface(mut iface) => {
            iface.name = name;
            iface.entry_point = Some(true);
            iface.export_path = export_path;
            iface.re_exported_from = from;
            module.interfaces.get_or_insert_with(Vec::new).push(iface);
        }
        EntityRecord::Enum(mut en) => {
            en.name = name;
            en.entry_point = Some(true);
            en.export_path = export_path;
            en.re_exported_from = from;
            module.enums.get_or_insert_with(Vec::new).push(en);
        }
        EntityRecord::Alias(mut alias) => {
            alias.name = name;
            alias.entry_point = Some(true);
            alias.export_path = export_path;
            alias.re_exported_from = from;
            module.types.get_or_insert_with(Vec::new).push(alias);
        }
        EntityRecord::Function(mut func) => {
            func.name = name;
            func.entry_point = Some(true);
            func.export_path = export_path;
            func.re_exported_from = from;
            module.functions.get_or_insert_with(Vec::new).push(func);
        }
    }
}

/// Blocking facade owning its own runtime, for callers outside an async
/// context.
pub struct TsEngine {
    runtime: tokio::runtime::Runtime,
}

impl TsEngine {
    /// Creates the engine and its runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineUnavailable`] if the runtime cannot start.
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::EngineUnavailable {
            reason: format!("failed to create runtime: {e}"),
        })?;
        Ok(Self { runtime })
    }

    /// Run one extraction rooted at `options.root`.
    pub fn extract(&self, mut options: ExtractOptions) -> Result<ApiIndex> {
        self.runtime.block_on(async {
            let fs = NativeFileSystem::new(&options.root).map_err(|e| Error::InputInvalid {
                path: options.root.clone(),
                reason: e.to_string(),
            })?;
            // Module names are derived relative to the root; keep it canonical.
            options.root = fs.project_root().to_path_buf();
            extract(&fs, options).await
        })
    }
}
