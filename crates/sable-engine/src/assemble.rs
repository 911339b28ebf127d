//! Graph assembly: deterministic IDs, cross-language join, deduplication,
//! reference filtering, and diagnostics finalization. After this pass the
//! index is immutable.

use std::collections::BTreeSet;

use sable_core::types::{ApiIndex, ClassInfo, CrossLanguageMap, EnumInfo, FunctionInfo,
    InterfaceInfo, ModuleInfo, TypeAliasInfo};

use crate::context::ExtractionContext;

/// Finalize the assembled graph in place.
pub fn assemble(
    index: &mut ApiIndex,
    cross: Option<&CrossLanguageMap>,
    ctx: &ExtractionContext,
) {
    index.modules.sort_by(|a, b| a.name.cmp(&b.name));
    dedupe_entities(&mut index.modules);
    for module in &mut index.modules {
        clear_empty_lists(module);
    }
    index.modules.retain(|m| !m.is_empty());

    let defined = defined_names(index);
    for module in &mut index.modules {
        filter_refs_in_module(module, &defined);
    }

    let package = index.package.clone();
    for module in &mut index.modules {
        assign_module_ids(module, &package);
    }
    if let Some(dependencies) = &mut index.dependencies {
        dependencies.sort_by(|a, b| a.package.cmp(&b.package));
        for dependency in dependencies {
            let dep_package = dependency.package.clone();
            for class in dependency.classes.iter_mut().flatten() {
                assign_class_ids(class, &dep_package);
            }
            for iface in dependency.interfaces.iter_mut().flatten() {
                assign_interface_ids(iface, &dep_package);
            }
            for en in dependency.enums.iter_mut().flatten() {
                en.id = Some(format!("{dep_package}.{}", en.name));
            }
            for alias in dependency.types.iter_mut().flatten() {
                alias.id = Some(format!("{dep_package}.{}", alias.name));
            }
        }
    }

    if let Some(cross) = cross {
        join_cross_language(index, cross);
    }

    index.diagnostics = ctx.summarize();
}

/// Exactly one entity survives per `(name, exportPath, condition)`; ties are
/// broken by traversal order.
fn dedupe_entities(modules: &mut [ModuleInfo]) {
    let mut seen: BTreeSet<(String, String, String)> = BTreeSet::new();

    for module in modules.iter_mut() {
        let condition = module.condition.clone().unwrap_or_default();
        let key = |name: &str, export_path: &Option<String>| {
            (
                name.to_string(),
                export_path.clone().unwrap_or_default(),
                condition.clone(),
            )
        };

        if let Some(classes) = &mut module.classes {
            classes.retain(|c| seen.insert(key(&c.name, &c.export_path)));
        }
        if let Some(interfaces) = &mut module.interfaces {
            interfaces.retain(|i| seen.insert(key(&i.name, &i.export_path)));
        }
        if let Some(enums) = &mut module.enums {
            enums.retain(|e| seen.insert(key(&e.name, &e.export_path)));
        }
        if let Some(types) = &mut module.types {
            types.retain(|t| seen.insert(key(&t.name, &t.export_path)));
        }
        if let Some(functions) = &mut module.functions {
            functions.retain(|f| seen.insert(key(&f.name, &f.export_path)));
        }
    }
}

fn clear_empty_lists(module: &mut ModuleInfo) {
    if module.classes.as_ref().is_some_and(Vec::is_empty) {
        module.classes = None;
    }
    if module.interfaces.as_ref().is_some_and(Vec::is_empty) {
        module.interfaces = None;
    }
    if module.enums.as_ref().is_some_and(Vec::is_empty) {
        module.enums = None;
    }
    if module.types.as_ref().is_some_and(Vec::is_empty) {
        module.types = None;
    }
    if module.functions.as_ref().is_some_and(Vec::is_empty) {
        module.functions = None;
    }
}

/// Every entity name defined anywhere in the index (modules and
/// dependencies, unresolved sentinels included).
fn defined_names(index: &ApiIndex) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for module in &index.modules {
        collect_module_names(module, &mut names);
    }
    for dependency in index.dependencies.iter().flatten() {
        for class in dependency.classes.iter().flatten() {
            names.insert(class.name.clone());
        }
        for iface in dependency.interfaces.iter().flatten() {
            names.insert(iface.name.clone());
        }
        for en in dependency.enums.iter().flatten() {
            names.insert(en.name.clone());
        }
        for alias in dependency.types.iter().flatten() {
            names.insert(alias.name.clone());
        }
    }
    names
}

fn collect_module_names(module: &ModuleInfo, names: &mut BTreeSet<String>) {
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

/// `referencedTypes` must be a subset of names defined in this index.
fn filter_refs_in_module(module: &mut ModuleInfo, defined: &BTreeSet<String>) {
    let filter = |refs: &mut Option<Vec<String>>| {
        if let Some(list) = refs {
            list.retain(|name| defined.contains(name));
            if list.is_empty() {
                *refs = None;
            }
        }
    };
    for class in module.classes.iter_mut().flatten() {
        filter(&mut class.referenced_types);
    }
    for iface in module.interfaces.iter_mut().flatten() {
        filter(&mut iface.referenced_types);
    }
    for alias in module.types.iter_mut().flatten() {
        filter(&mut alias.referenced_types);
    }
    for func in module.functions.iter_mut().flatten() {
        filter(&mut func.referenced_types);
    }
}

fn assign_module_ids(module: &mut ModuleInfo, package: &str) {
    for class in module.classes.iter_mut().flatten() {
        assign_class_ids(class, package);
    }
    for iface in module.interfaces.iter_mut().flatten() {
        assign_interface_ids(iface, package);
    }
    for en in module.enums.iter_mut().flatten() {
        assign_enum_id(en, package);
    }
    for alias in module.types.iter_mut().flatten() {
        assign_alias_id(alias, package);
    }
    for func in module.functions.iter_mut().flatten() {
        assign_function_id(func, package);
    }
}

fn assign_class_ids(class: &mut ClassInfo, package: &str) {
    let id = format!("{package}.{}", class.name);
    for ctor in class.constructors.iter_mut().flatten() {
        ctor.id = Some(format!("{id}.constructor"));
    }
    for method in class.methods.iter_mut().flatten() {
        method.id = Some(format!("{id}.{}", method.name));
    }
    for prop in class.properties.iter_mut().flatten() {
        prop.id = Some(format!("{id}.{}", prop.name));
    }
    class.id = Some(id);
}

fn assign_interface_ids(iface: &mut InterfaceInfo, package: &str) {
    let id = format!("{package}.{}", iface.name);
    for method in iface.methods.iter_mut().flatten() {
        method.id = Some(format!("{id}.{}", method.name));
    }
    for prop in iface.properties.iter_mut().flatten() {
        prop.id = Some(format!("{id}.{}", prop.name));
    }
    iface.id = Some(id);
}

fn assign_enum_id(en: &mut EnumInfo, package: &str) {
    en.id = Some(format!("{package}.{}", en.name));
}

fn assign_alias_id(alias: &mut TypeAliasInfo, package: &str) {
    alias.id = Some(format!("{package}.{}", alias.name));
}

fn assign_function_id(func: &mut FunctionInfo, package: &str) {
    func.id = Some(format!("{package}.{}", func.name));
}

/// Attach cross-language IDs wherever the map knows the local ID. The join
/// is idempotent: rerunning it with the same map rewrites the same values.
fn join_cross_language(index: &mut ApiIndex, cross: &CrossLanguageMap) {
    index.cross_language_package_id = Some(cross.package_id.clone());

    let lookup = |id: &Option<String>| {
        id.as_ref()
            .and_then(|id| cross.ids.get(id))
            .cloned()
    };

    for module in &mut index.modules {
        for class in module.classes.iter_mut().flatten() {
            class.cross_language_id = lookup(&class.id);
            for ctor in class.constructors.iter_mut().flatten() {
                ctor.cross_language_id = lookup(&ctor.id);
            }
            for method in class.methods.iter_mut().flatten() {
                method.cross_language_id = lookup(&method.id);
            }
            for prop in class.properties.iter_mut().flatten() {
                prop.cross_language_id = lookup(&prop.id);
            }
        }
        for iface in module.interfaces.iter_mut().flatten() {
            iface.cross_language_id = lookup(&iface.id);
            for method in iface.methods.iter_mut().flatten() {
                method.cross_language_id = lookup(&method.id);
            }
            for prop in iface.properties.iter_mut().flatten() {
                prop.cross_language_id = lookup(&prop.id);
            }
        }
        for en in module.enums.iter_mut().flatten() {
            en.cross_language_id = lookup(&en.id);
        }
        for alias in module.types.iter_mut().flatten() {
            alias.cross_language_id = lookup(&alias.id);
        }
        for func in module.functions.iter_mut().flatten() {
            func.cross_language_id = lookup(&func.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::types::MethodInfo;

    fn index_with_class() -> ApiIndex {
        ApiIndex {
            package: "pkg".to_string(),
            modules: vec![ModuleInfo {
                name: "index".to_string(),
                condition: Some("default".to_string()),
                classes: Some(vec![ClassInfo {
                    name: "Client".to_string(),
                    methods: Some(vec![MethodInfo {
                        name: "send".to_string(),
                        sig: "()".to_string(),
                        ..Default::default()
                    }]),
                    referenced_types: Some(vec!["Known".to_string(), "Unknown".to_string()]),
                    ..Default::default()
                }]),
                interfaces: Some(vec![InterfaceInfo {
                    name: "Known".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_id_assignment() {
        let mut index = index_with_class();
        assemble(&mut index, None, &ExtractionContext::default());

        let class = &index.modules[0].classes.as_ref().unwrap()[0];
        assert_eq!(class.id.as_deref(), Some("pkg.Client"));
        assert_eq!(
            class.methods.as_ref().unwrap()[0].id.as_deref(),
            Some("pkg.Client.send")
        );
    }

    #[test]
    fn test_reference_filtering_to_defined_names() {
        let mut index = index_with_class();
        assemble(&mut index, None, &ExtractionContext::default());

        let class = &index.modules[0].classes.as_ref().unwrap()[0];
        assert_eq!(
            class.referenced_types.as_ref().unwrap(),
            &vec!["Known".to_string()]
        );
    }

    #[test]
    fn test_cross_language_join() {
        let mut index = index_with_class();
        let mut cross = CrossLanguageMap {
            package_id: "dotnet/Pkg".to_string(),
            ..Default::default()
        };
        cross
            .ids
            .insert("pkg.Client".to_string(), "Pkg.Client".to_string());
        cross
            .ids
            .insert("pkg.Client.send".to_string(), "Pkg.Client.Send".to_string());

        assemble(&mut index, Some(&cross), &ExtractionContext::default());

        assert_eq!(index.cross_language_package_id.as_deref(), Some("dotnet/Pkg"));
        let class = &index.modules[0].classes.as_ref().unwrap()[0];
        assert_eq!(class.cross_language_id.as_deref(), Some("Pkg.Client"));
        assert_eq!(
            class.methods.as_ref().unwrap()[0].cross_language_id.as_deref(),
            Some("Pkg.Client.Send")
        );

        // Idempotent join.
        let snapshot = index.clone();
        assemble(&mut index, Some(&cross), &ExtractionContext::default());
        assert_eq!(snapshot, index);
    }

    #[test]
    fn test_dedupe_same_key_keeps_first() {
        let mut index = index_with_class();
        index.modules.push(ModuleInfo {
            name: "other".to_string(),
            condition: Some("default".to_string()),
            classes: Some(vec![ClassInfo {
                name: "Client".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        });

        assemble(&mut index, None, &ExtractionContext::default());

        let total: usize = index
            .modules
            .iter()
            .map(|m| m.classes.as_ref().map_or(0, Vec::len))
            .sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_modules_sorted_by_name() {
        let iface = |name: &str| InterfaceInfo {
            name: name.to_string(),
            ..Default::default()
        };
        let mut index = ApiIndex {
            package: "pkg".to_string(),
            modules: vec![
                ModuleInfo {
                    name: "zeta".to_string(),
                    interfaces: Some(vec![iface("Z")]),
                    ..Default::default()
                },
                ModuleInfo {
                    name: "alpha".to_string(),
                    interfaces: Some(vec![iface("A")]),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assemble(&mut index, None, &ExtractionContext::default());
        assert_eq!(index.modules[0].name, "alpha");
        assert_eq!(index.modules[1].name, "zeta");
    }
}
