//! Reachability: BFS from entry points through `referencedTypes` edges,
//! then filter the graph down to what the closure touches. Filtering is
//! idempotent — running it twice changes nothing.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use sable_core::types::ModuleInfo;

/// Names reachable from entry points through reference edges.
pub fn compute_reachable(modules: &[ModuleInfo]) -> BTreeSet<String> {
    let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut defined: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for module in modules {
        for (name, entry_point, refs) in entities_of(module) {
            defined.insert(name);
            if entry_point {
                queue.push_back(name);
            }
            if let Some(refs) = refs {
                edges
                    .entry(name)
                    .or_default()
                    .extend(refs.iter().map(String::as_str));
            }
        }
    }

    let mut reachable: BTreeSet<String> = BTreeSet::new();
    while let Some(name) = queue.pop_front() {
        if !reachable.insert(name.to_string()) {
            continue;
        }
        if let Some(neighbors) = edges.get(name) {
            for &neighbor in neighbors {
                if defined.contains(neighbor) && !reachable.contains(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
    }
    reachable
}

/// Retain only reachable entities; drop modules that become empty.
pub fn filter_modules(modules: Vec<ModuleInfo>, reachable: &BTreeSet<String>) -> Vec<ModuleInfo> {
    let mut out = Vec::new();
    for mut module in modules {
        if let Some(classes) = &mut module.classes {
            classes.retain(|c| reachable.contains(&c.name));
        }
        if let Some(interfaces) = &mut module.interfaces {
            interfaces.retain(|i| reachable.contains(&i.name));
        }
        if let Some(enums) = &mut module.enums {
            enums.retain(|e| reachable.contains(&e.name));
        }
        if let Some(types) = &mut module.types {
            types.retain(|t| reachable.contains(&t.name));
        }
        if let Some(functions) = &mut module.functions {
            functions.retain(|f| reachable.contains(&f.name));
        }

        clear_empty(&mut module);
        if !module.is_empty() {
            out.push(module);
        }
    }
    out
}

fn clear_empty(module: &mut ModuleInfo) {
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

/// `(name, entryPoint, referencedTypes)` for every entity in a module.
fn entities_of(
    module: &ModuleInfo,
) -> impl Iterator<Item = (&str, bool, Option<&Vec<String>>)> {
    let classes = module.classes.iter().flatten().map(|c| {
        (
            c.name.as_str(),
            c.entry_point.unwrap_or(false),
            c.referenced_types.as_ref(),
        )
    });
    let interfaces = module.interfaces.iter().flatten().map(|i| {
        (
            i.name.as_str(),
            i.entry_point.unwrap_or(false),
            i.referenced_types.as_ref(),
        )
    });
    let enums = module
        .enums
        .iter()
        .flatten()
        .map(|e| (e.name.as_str(), e.entry_point.unwrap_or(false), None));
    let types = module.types.iter().flatten().map(|t| {
        (
            t.name.as_str(),
            t.entry_point.unwrap_or(false),
            t.referenced_types.as_ref(),
        )
    });
    let functions = module.functions.iter().flatten().map(|f| {
        (
            f.name.as_str(),
            f.entry_point.unwrap_or(false),
            f.referenced_types.as_ref(),
        )
    });
    classes
        .chain(interfaces)
        .chain(enums)
        .chain(types)
        .chain(functions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::types::InterfaceInfo;

    fn iface(name: &str, entry: bool, refs: &[&str]) -> InterfaceInfo {
        InterfaceInfo {
            name: name.to_string(),
            entry_point: entry.then_some(true),
            export_path: entry.then(|| ".".to_string()),
            referenced_types: if refs.is_empty() {
                None
            } else {
                Some(refs.iter().map(|r| r.to_string()).collect())
            },
            ..Default::default()
        }
    }

    fn module(interfaces: Vec<InterfaceInfo>) -> ModuleInfo {
        ModuleInfo {
            name: "index".to_string(),
            interfaces: Some(interfaces),
            ..Default::default()
        }
    }

    #[test]
    fn test_unreferenced_entities_are_pruned() {
        let modules = vec![module(vec![
            iface("A", true, &["B"]),
            iface("B", false, &[]),
            iface("C", false, &[]),
        ])];

        let reachable = compute_reachable(&modules);
        assert_eq!(
            reachable,
            ["A", "B"].iter().map(|s| s.to_string()).collect()
        );

        let filtered = filter_modules(modules, &reachable);
        let names: Vec<&str> = filtered[0]
            .interfaces
            .as_ref()
            .unwrap()
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_cycles_terminate() {
        let modules = vec![module(vec![
            iface("A", true, &["B"]),
            iface("B", false, &["A"]),
        ])];
        let reachable = compute_reachable(&modules);
        assert_eq!(reachable.len(), 2);
    }

    #[test]
    fn test_empty_modules_are_dropped() {
        let modules = vec![
            module(vec![iface("A", true, &[])]),
            module(vec![iface("Orphan", false, &[])]),
        ];
        let reachable = compute_reachable(&modules);
        let filtered = filter_modules(modules, &reachable);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let modules = vec![module(vec![
            iface("A", true, &["B", "Missing"]),
            iface("B", false, &[]),
            iface("C", false, &["A"]),
        ])];
        let reachable = compute_reachable(&modules);
        let once = filter_modules(modules, &reachable);
        let twice = filter_modules(once.clone(), &compute_reachable(&once));
        assert_eq!(once, twice);
    }
}
