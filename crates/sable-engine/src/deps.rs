//! Dependency resolution: extract minimal faithful records for every
//! external type the reachable surface mentions, expanding transitively to a
//! fixed point.
//!
//! Each referenced name is visited at most once (`processed` guards
//! reentry), so mutually recursive packages terminate. Types that cannot be
//! located are preserved as `unresolved` alias sentinels so consumers can
//! tell "absent" from "unknown".

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use sable_core::diag::codes;
use sable_core::types::{DependencyInfo, ModuleInfo, TypeAliasInfo};
use sable_core::{ExtractMode, Result};
use sable_fs::FileSystem;

use crate::builtins::{is_node_module, BuiltinClassifier};
use crate::context::ExtractionContext;
use crate::exports::{package_of_specifier, resolve_entry_file, ExternalReexport};
use crate::extract::{extract_decl, EntityRecord};
use crate::ir::{DeclIr, FileIr};
use crate::manifest::PackageManifest;
use crate::project::Project;

/// Result of dependency expansion.
#[derive(Debug, Default)]
pub struct DepResolution {
    /// Sorted by package name.
    pub dependencies: Vec<DependencyInfo>,
    /// Entities re-exported from external packages at an entry point; they
    /// belong in the re-exporting module, not in `dependencies`.
    pub reexported: Vec<(ExternalReexport, EntityRecord)>,
}

/// Outcome of looking a name up inside a dependency package.
enum ExtractOutcome {
    Found(EntityRecord),
    /// A self-referential alias artifact; emit nothing at all.
    Suppressed,
    Missing,
}

#[derive(Debug, Clone)]
struct QueueItem {
    package: String,
    /// Name to look up inside the package (`default` for default imports).
    lookup: String,
    /// Name to report in sentinels and records.
    label: String,
    /// Preferred file to search first (sub-references with a known
    /// declaration path).
    via: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct DepBucket {
    is_node: bool,
    classes: Vec<sable_core::types::ClassInfo>,
    interfaces: Vec<sable_core::types::InterfaceInfo>,
    enums: Vec<sable_core::types::EnumInfo>,
    types: Vec<TypeAliasInfo>,
}

impl DepBucket {
    fn contains(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c.name == name)
            || self.interfaces.iter().any(|i| i.name == name)
            || self.enums.iter().any(|e| e.name == name)
            || self.types.iter().any(|t| t.name == name)
    }
}

/// Expand external references of the reachable surface into dependency
/// records.
#[allow(clippy::too_many_arguments)]
pub async fn resolve_dependencies<F: FileSystem>(
    fs: &F,
    project: &mut Project,
    package_root: &Path,
    package_name: &str,
    modules: &[ModuleInfo],
    external_reexports: &[ExternalReexport],
    builtins: &BuiltinClassifier,
    ctx: &mut ExtractionContext,
) -> Result<DepResolution> {
    let mut resolver = DepResolver {
        fs,
        project,
        package_root: package_root.to_path_buf(),
        package_name: package_name.to_string(),
        builtins,
        processed: FxHashSet::default(),
        buckets: BTreeMap::new(),
        entry_cache: BTreeMap::new(),
        local_names: local_entity_names(modules),
    };

    let mut queue: VecDeque<QueueItem> = VecDeque::new();

    // Initial queue: external refs scoped to reachable entities.
    for module in modules {
        let Some(file_ir) = resolver.file_for_module(&module.name) else {
            continue;
        };
        for refs in entity_refs(module) {
            for reference in refs {
                resolver.enqueue_ref(reference, &file_ir, None, &mut queue);
            }
        }
    }

    // External entry-point re-exports resolve through the same machinery.
    let mut reexported = Vec::new();
    for reexport in external_reexports {
        ctx.cancel.check()?;
        if reexport.package == resolver.package_name {
            continue;
        }
        if is_node_module(&reexport.package) {
            continue;
        }
        resolver.processed.insert((
            reexport.package.clone(),
            reexport.local_name.clone(),
        ));
        match resolver
            .extract_named(&reexport.package, &reexport.local_name, None, ctx, &mut queue)
            .await?
        {
            ExtractOutcome::Found(record) => {
                resolver.local_names.insert(record.name().to_string());
                reexported.push((reexport.clone(), record));
            }
            ExtractOutcome::Suppressed => {}
            ExtractOutcome::Missing => {
                resolver.record_unresolved(&reexport.package, &reexport.local_name, ctx);
            }
        }
    }

    // Fixed-point worklist.
    while let Some(item) = queue.pop_front() {
        ctx.cancel.check()?;
        if !resolver
            .processed
            .insert((item.package.clone(), item.lookup.clone()))
        {
            continue;
        }
        if item.package == resolver.package_name {
            continue;
        }

        match resolver
            .extract_named(&item.package, &item.lookup, item.via.clone(), ctx, &mut queue)
            .await?
        {
            ExtractOutcome::Found(record) => resolver.record_entity(&item.package, record),
            ExtractOutcome::Suppressed => {}
            ExtractOutcome::Missing => {
                resolver.record_unresolved(&item.package, &item.label, ctx)
            }
        }
    }

    Ok(DepResolution {
        dependencies: resolver.into_dependencies(),
        reexported,
    })
}

struct DepResolver<'a, F> {
    fs: &'a F,
    project: &'a mut Project,
    package_root: PathBuf,
    package_name: String,
    builtins: &'a BuiltinClassifier,
    processed: FxHashSet<(String, String)>,
    buckets: BTreeMap<String, DepBucket>,
    /// Package -> resolved entry declaration file (None when missing).
    entry_cache: BTreeMap<String, Option<PathBuf>>,
    local_names: BTreeSet<String>,
}

impl<'a, F: FileSystem> DepResolver<'a, F> {
    fn file_for_module(&self, module_name: &str) -> Option<Arc<FileIr>> {
        self.project
            .files()
            .find(|f| f.module_name == module_name)
            .cloned()
    }

    /// Attribute one referenced name from `file` and enqueue it if external.
    fn enqueue_ref(
        &mut self,
        reference: &str,
        file: &FileIr,
        current_package: Option<&str>,
        queue: &mut VecDeque<QueueItem>,
    ) {
        // Types already defined in the index are never dependency edges.
        if self.local_names.contains(reference) {
            return;
        }
        let root = reference.split('.').next().unwrap_or(reference);
        let member = reference.split('.').next_back().unwrap_or(reference);
        if self.builtins.is_builtin(root) {
            return;
        }
        if self.builtins.is_node_ambient(root) {
            self.record_node_ambient(reference);
            return;
        }

        for import in &file.imports {
            let matches_root = import.default_local.as_deref() == Some(root)
                || import.namespace_local.as_deref() == Some(root)
                || import.named.iter().any(|(_, local)| local == root);
            if !matches_root {
                continue;
            }

            if import.is_bare() {
                if is_node_module(&import.source) {
                    // Runtime module types never become dependency types.
                    return;
                }
                let package = package_of_specifier(&import.source);
                let lookup = if import.default_local.as_deref() == Some(root) {
                    "default".to_string()
                } else if import.namespace_local.as_deref() == Some(root) {
                    member.to_string()
                } else {
                    import
                        .named
                        .iter()
                        .find(|(_, local)| local == root)
                        .map(|(imported, _)| imported.clone())
                        .unwrap_or_else(|| root.to_string())
                };
                queue.push_back(QueueItem {
                    package,
                    label: lookup.clone(),
                    lookup,
                    via: None,
                });
                return;
            }

            // Relative import inside a dependency package: follow it there.
            if let Some(package) = current_package {
                if let Some(target) = self.project.resolve_module(&file.path, &import.source) {
                    let lookup = import
                        .named
                        .iter()
                        .find(|(_, local)| local == root)
                        .map(|(imported, _)| imported.clone())
                        .unwrap_or_else(|| root.to_string());
                    queue.push_back(QueueItem {
                        package: package.to_string(),
                        label: lookup.clone(),
                        lookup,
                        via: Some(target),
                    });
                }
                return;
            }
            return;
        }

        // Not imported. Inside a dependency file the name may be declared in
        // the same file; locally it is simply unresolvable.
        if let Some(package) = current_package {
            if file.decl(member).is_some() || file.decl(root).is_some() {
                let lookup = if file.decl(member).is_some() { member } else { root };
                queue.push_back(QueueItem {
                    package: package.to_string(),
                    lookup: lookup.to_string(),
                    label: lookup.to_string(),
                    via: Some(file.path.clone()),
                });
            } else {
                queue.push_back(QueueItem {
                    package: package.to_string(),
                    lookup: member.to_string(),
                    label: member.to_string(),
                    via: None,
                });
            }
        }
    }

    /// Locate `lookup` inside `package` and extract it. Also enqueues the
    /// extracted entity's own references.
    async fn extract_named(
        &mut self,
        package: &str,
        lookup: &str,
        via: Option<PathBuf>,
        ctx: &mut ExtractionContext,
        queue: &mut VecDeque<QueueItem>,
    ) -> Result<ExtractOutcome> {
        let mut start_files: Vec<PathBuf> = Vec::new();
        if let Some(via) = via {
            start_files.push(via);
        }
        if let Some(entry) = self.package_entry(package, ctx).await? {
            if !start_files.contains(&entry) {
                start_files.push(entry);
            }
        }
        if start_files.is_empty() {
            return Ok(ExtractOutcome::Missing);
        }

        // BFS through the package's local re-export chains.
        let mut queue_files: VecDeque<PathBuf> = start_files.into();
        let mut visited: FxHashSet<PathBuf> = FxHashSet::default();
        while let Some(path) = queue_files.pop_front() {
            ctx.cancel.check()?;
            if !visited.insert(path.clone()) {
                continue;
            }
            let Some(file) = self.project.add_file(self.fs, &path, ctx).await? else {
                continue;
            };

            if let Some(decl) = find_decl(&file, lookup) {
                if let Some(alias) = self_referential_alias(decl) {
                    tracing::debug!(alias, package, "suppressing self-referential alias");
                    return Ok(ExtractOutcome::Suppressed);
                }
                match extract_decl(&file, decl, self.builtins) {
                    Some((record, refs)) => {
                        for reference in &refs {
                            self.enqueue_ref(reference, &file, Some(package), queue);
                        }
                        return Ok(ExtractOutcome::Found(record));
                    }
                    None => {
                        ctx.warn_type(
                            codes::DEP_EXTRACT,
                            lookup,
                            format!("could not extract \"{lookup}\" from {package}"),
                        );
                        return Ok(ExtractOutcome::Missing);
                    }
                }
            }

            for reexport in &file.reexports {
                if reexport.is_bare() {
                    continue;
                }
                let follow = reexport.is_star
                    || reexport.names.iter().any(|(local, _)| local == lookup);
                if follow {
                    if let Some(target) = self.project.resolve_module(&file.path, &reexport.source)
                    {
                        queue_files.push_back(target);
                    }
                }
            }
        }
        Ok(ExtractOutcome::Missing)
    }

    /// Entry declaration file for `node_modules/<package>`, cached.
    async fn package_entry(
        &mut self,
        package: &str,
        ctx: &mut ExtractionContext,
    ) -> Result<Option<PathBuf>> {
        if let Some(cached) = self.entry_cache.get(package) {
            return Ok(cached.clone());
        }

        let dir = self.package_root.join("node_modules").join(package);
        ctx.cancel.check()?;
        let entry = if self.fs.is_dir(&dir).await? {
            self.locate_entry_dts(&dir, ctx).await?
        } else {
            None
        };
        self.entry_cache.insert(package.to_string(), entry.clone());
        Ok(entry)
    }

    async fn locate_entry_dts(
        &mut self,
        dir: &Path,
        ctx: &mut ExtractionContext,
    ) -> Result<Option<PathBuf>> {
        let manifest_path = dir.join("package.json");
        let mut targets: Vec<String> = Vec::new();

        if self.fs.exists(&manifest_path).await? {
            let text = self.fs.read_to_string(&manifest_path).await?;
            if let Ok(manifest) = PackageManifest::parse(&text, &manifest_path) {
                for target in [&manifest.types, &manifest.typings].into_iter().flatten() {
                    targets.push(target.clone());
                }
                for entry in crate::manifest::flatten_exports(&manifest) {
                    if entry.export_path == "." {
                        targets.push(entry.target);
                    }
                }
                for target in [&manifest.module, &manifest.main].into_iter().flatten() {
                    targets.push(target.clone());
                }
            }
        }
        targets.push("index.d.ts".to_string());

        for target in targets {
            ctx.cancel.check()?;
            if let Some(path) =
                resolve_entry_file(self.fs, dir, None, ExtractMode::Compiled, &target).await?
            {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    fn record_entity(&mut self, package: &str, record: EntityRecord) {
        let bucket = self.buckets.entry(package.to_string()).or_default();
        if bucket.contains(record.name()) {
            return;
        }
        match record {
            EntityRecord::Class(c) => bucket.classes.push(c),
            EntityRecord::Interface(i) => bucket.interfaces.push(i),
            EntityRecord::Enum(e) => bucket.enums.push(e),
            EntityRecord::Alias(a) => {
                if !a.name.is_empty() {
                    bucket.types.push(a);
                }
            }
            // Dependency surfaces carry types; functions only appear through
            // entry-point re-exports.
            EntityRecord::Function(_) => {}
        }
    }

    fn record_unresolved(&mut self, package: &str, name: &str, ctx: &mut ExtractionContext) {
        ctx.unresolved(package, name);
        let bucket = self.buckets.entry(package.to_string()).or_default();
        if !bucket.contains(name) {
            bucket.types.push(TypeAliasInfo::unresolved(name));
        }
    }

    fn record_node_ambient(&mut self, name: &str) {
        let bucket = self.buckets.entry("node".to_string()).or_default();
        bucket.is_node = true;
        if !bucket.contains(name) {
            bucket.types.push(TypeAliasInfo::unresolved(name));
        }
    }

    fn into_dependencies(self) -> Vec<DependencyInfo> {
        let mut out = Vec::new();
        for (package, mut bucket) in self.buckets {
            if package == self.package_name {
                continue;
            }
            bucket.classes.sort_by(|a, b| a.name.cmp(&b.name));
            bucket.interfaces.sort_by(|a, b| a.name.cmp(&b.name));
            bucket.enums.sort_by(|a, b| a.name.cmp(&b.name));
            bucket.types.sort_by(|a, b| a.name.cmp(&b.name));

            out.push(DependencyInfo {
                package,
                is_node: bucket.is_node.then_some(true),
                classes: non_empty(bucket.classes),
                interfaces: non_empty(bucket.interfaces),
                enums: non_empty(bucket.enums),
                types: non_empty(bucket.types),
            });
        }
        out
    }
}

/// All entity names defined across the package's own modules.
fn local_entity_names(modules: &[ModuleInfo]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for module in modules {
        for class in module.classes.iter().flatten() {
            names.insert(class.name.clone());
        }
        for iface in module.interfaces.iter().flatten() {
            names.insert(iface.name.clone());
        }
        for en in module.enums.iter().flatten() {
            names.insert(en.name.clone());
        }
        for alias in module.types.iter().flatten() {
            names.insert(alias.name.clone());
        }
        for func in module.functions.iter().flatten() {
            names.insert(func.name.clone());
        }
    }
    names
}

fn entity_refs(module: &ModuleInfo) -> impl Iterator<Item = &Vec<String>> {
    let classes = module
        .classes
        .iter()
        .flatten()
        .filter_map(|c| c.referenced_types.as_ref());
    let interfaces = module
        .interfaces
        .iter()
        .flatten()
        .filter_map(|i| i.referenced_types.as_ref());
    let types = module
        .types
        .iter()
        .flatten()
        .filter_map(|t| t.referenced_types.as_ref());
    let functions = module
        .functions
        .iter()
        .flatten()
        .filter_map(|f| f.referenced_types.as_ref());
    classes.chain(interfaces).chain(types).chain(functions)
}

/// Find a declaration by exported name; `default` resolves through the
/// file's default-export alias.
fn find_decl<'f>(file: &'f FileIr, lookup: &str) -> Option<&'f DeclIr> {
    if lookup == "default" {
        let local = file
            .export_aliases
            .iter()
            .find(|(_, exported)| exported == "default")
            .map(|(local, _)| local.clone())?;
        return file.decl(&local);
    }
    file.decl(lookup)
}

/// A dependency alias whose body is literally its own name (or `Name<...>`)
/// is a re-export artifact, not a real type.
fn self_referential_alias(decl: &DeclIr) -> Option<&str> {
    let DeclIr::Alias(alias) = decl else {
        return None;
    };
    let name = alias.common.name.as_str();
    let body = alias.ann.text.trim();
    if body == name || (body.starts_with(&format!("{name}<")) && body.ends_with('>')) {
        Some(name)
    } else {
        None
    }
}

fn non_empty<T>(v: Vec<T>) -> Option<Vec<T>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::lower_source;

    fn alias_decl(src: &str, name: &str) -> DeclIr {
        let file = lower_source(src, Path::new("x.d.ts"), "x".to_string()).unwrap();
        file.decl(name).unwrap().clone()
    }

    #[test]
    fn test_self_referential_alias_detection() {
        let decl = alias_decl("export type Foo = Foo;", "Foo");
        assert_eq!(self_referential_alias(&decl), Some("Foo"));

        let decl = alias_decl("export type Foo = Foo<string>;", "Foo");
        assert_eq!(self_referential_alias(&decl), Some("Foo"));

        let decl = alias_decl("export type Foo = Bar;", "Foo");
        assert_eq!(self_referential_alias(&decl), None);
    }

    #[test]
    fn test_find_default_decl() {
        let file = lower_source(
            "export default class Client {}\n",
            Path::new("x.d.ts"),
            "x".to_string(),
        )
        .unwrap();
        let decl = find_decl(&file, "default").unwrap();
        assert_eq!(decl.name(), "Client");
        assert!(find_decl(&file, "Missing").is_none());
    }
}
