//! API-derived maps driving sample type inference.
//!
//! Everything the analyzer knows comes from the `ApiIndex` — sample files
//! are never type-checked. Three maps are built once per analysis:
//! property types, method return types, and module-function return types,
//! each keyed toward the client set.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};
use sable_core::types::{ApiIndex, ClassInfo, InterfaceInfo};

/// Async wrappers unwrapped (depth-matched) before reading a return type.
const ASYNC_WRAPPERS: &[&str] = &[
    "Promise",
    "PromiseLike",
    "AsyncIterable",
    "AsyncIterableIterator",
];

/// Structural facts derived from one [`ApiIndex`].
#[derive(Debug, Default)]
pub struct ApiMaps {
    /// Client type names (entry points plus transitive promotions).
    pub clients: FxHashSet<String>,

    /// `Owner.property` -> client type name.
    pub property_type_map: FxHashMap<String, String>,

    /// `Owner.method` -> client type name (async wrappers unwrapped).
    pub method_return_type_map: FxHashMap<String, String>,

    /// Module-level `function` -> client type name.
    pub function_return_type_map: FxHashMap<String, String>,

    /// Every type with methods -> its method names.
    pub methods_by_type: BTreeMap<String, BTreeSet<String>>,

    /// Deprecated `(type, method)` pairs.
    pub deprecated: BTreeSet<(String, String)>,

    /// interface -> implementing classes.
    pub implementers: BTreeMap<String, Vec<String>>,

    /// class -> implemented interfaces.
    pub interfaces_of: BTreeMap<String, Vec<String>>,
}

/// One type's structural surface, unified over classes and interfaces.
struct TypeSurface {
    name: String,
    entry_point: bool,
    /// `(property name, declared type text)`.
    properties: Vec<(String, String)>,
    /// `(method name, return type text, deprecated)`.
    methods: Vec<(String, Option<String>, bool)>,
}

impl ApiMaps {
    pub fn build(api: &ApiIndex) -> Self {
        let mut maps = ApiMaps::default();
        let surfaces = collect_surfaces(api);

        for surface in &surfaces {
            if !surface.methods.is_empty() {
                let methods = maps.methods_by_type.entry(surface.name.clone()).or_default();
                for (name, _, deprecated) in &surface.methods {
                    methods.insert(name.clone());
                    if *deprecated {
                        maps.deprecated
                            .insert((surface.name.clone(), name.clone()));
                    }
                }
            }
        }

        maps.expand_clients(api, &surfaces);

        // The three inference maps, restricted to client targets.
        for surface in &surfaces {
            for (prop, ty) in &surface.properties {
                if let Some(client) = maps.client_of(ty) {
                    maps.property_type_map
                        .insert(format!("{}.{prop}", surface.name), client);
                }
            }
            for (method, ret, _) in &surface.methods {
                if let Some(ret) = ret {
                    if let Some(client) = maps.client_of(ret) {
                        maps.method_return_type_map
                            .insert(format!("{}.{method}", surface.name), client);
                    }
                }
            }
        }
        for module in &api.modules {
            for func in module.functions.iter().flatten() {
                if let Some(ret) = &func.ret {
                    if let Some(client) = maps.client_of(ret) {
                        maps.function_return_type_map
                            .insert(func.name.clone(), client);
                    }
                }
            }
        }

        maps
    }

    /// Client named by a declared type text, if any.
    fn client_of(&self, type_text: &str) -> Option<String> {
        let name = base_type_name(&unwrap_async_wrappers(type_text))?;
        if self.clients.contains(&name) {
            Some(name)
        } else {
            None
        }
    }

    /// True when `type_name` declares `method` (directly).
    pub fn declares(&self, type_name: &str, method: &str) -> bool {
        self.methods_by_type
            .get(type_name)
            .is_some_and(|methods| methods.contains(method))
    }

    /// Seed the client set from entry points and expand to a fixed point:
    /// property types, unwrapped method/function return types, aggregator
    /// containers, and interface/implementer links all promote.
    fn expand_clients(&mut self, api: &ApiIndex, surfaces: &[TypeSurface]) {
        for module in &api.modules {
            for class in module.classes.iter().flatten() {
                for implemented in class.implements.iter().flatten() {
                    self.implementers
                        .entry(implemented.clone())
                        .or_default()
                        .push(class.name.clone());
                    self.interfaces_of
                        .entry(class.name.clone())
                        .or_default()
                        .push(implemented.clone());
                }
            }
        }

        for surface in surfaces {
            if surface.entry_point && !surface.methods.is_empty() {
                self.clients.insert(surface.name.clone());
            }
        }

        // Entry-point module functions promote their return types.
        let mut pending_names: Vec<String> = Vec::new();
        for module in &api.modules {
            for func in module.functions.iter().flatten() {
                if func.entry_point.unwrap_or(false) {
                    if let Some(ret) = &func.ret {
                        if let Some(name) = base_type_name(&unwrap_async_wrappers(ret)) {
                            pending_names.push(name);
                        }
                    }
                }
            }
        }

        loop {
            let mut changed = false;

            for name in pending_names.drain(..) {
                if self.methods_by_type.contains_key(&name) && self.clients.insert(name) {
                    changed = true;
                }
            }

            for surface in surfaces {
                let is_client = self.clients.contains(&surface.name);

                if is_client {
                    // Properties and returns of a client name clients.
                    for (_, ty) in &surface.properties {
                        if let Some(name) = base_type_name(&unwrap_async_wrappers(ty)) {
                            if self.methods_by_type.contains_key(&name)
                                && self.clients.insert(name)
                            {
                                changed = true;
                            }
                        }
                    }
                    for (_, ret, _) in &surface.methods {
                        if let Some(ret) = ret {
                            if let Some(name) = base_type_name(&unwrap_async_wrappers(ret)) {
                                if self.methods_by_type.contains_key(&name)
                                    && self.clients.insert(name)
                                {
                                    changed = true;
                                }
                            }
                        }
                    }
                } else {
                    // Aggregators: a container holding a client is a client.
                    let holds_client = surface.properties.iter().any(|(_, ty)| {
                        base_type_name(&unwrap_async_wrappers(ty))
                            .is_some_and(|name| self.clients.contains(&name))
                    });
                    if holds_client
                        && !surface.methods.is_empty()
                        && self.clients.insert(surface.name.clone())
                    {
                        changed = true;
                    }
                }
            }

            // Interface <-> implementer links travel both ways.
            let mut linked: Vec<String> = Vec::new();
            for (iface, classes) in &self.implementers {
                if self.clients.contains(iface) {
                    linked.extend(classes.iter().cloned());
                }
                if classes.iter().any(|c| self.clients.contains(c)) {
                    linked.push(iface.clone());
                }
            }
            for name in linked {
                if self.methods_by_type.contains_key(&name) && self.clients.insert(name) {
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }
    }
}

fn collect_surfaces(api: &ApiIndex) -> Vec<TypeSurface> {
    let mut surfaces = Vec::new();
    for module in &api.modules {
        for class in module.classes.iter().flatten() {
            surfaces.push(class_surface(class));
        }
        for iface in module.interfaces.iter().flatten() {
            surfaces.push(interface_surface(iface));
        }
    }
    for dependency in api.dependencies.iter().flatten() {
        for class in dependency.classes.iter().flatten() {
            surfaces.push(class_surface(class));
        }
        for iface in dependency.interfaces.iter().flatten() {
            surfaces.push(interface_surface(iface));
        }
    }
    surfaces
}

fn class_surface(class: &ClassInfo) -> TypeSurface {
    TypeSurface {
        name: class.name.clone(),
        entry_point: class.entry_point.unwrap_or(false),
        properties: class
            .properties
            .iter()
            .flatten()
            .filter_map(|p| p.ty.as_ref().map(|ty| (p.name.clone(), ty.clone())))
            .collect(),
        methods: class
            .methods
            .iter()
            .flatten()
            .map(|m| {
                (
                    m.name.clone(),
                    m.ret.clone(),
                    m.deprecated.unwrap_or(false),
                )
            })
            .collect(),
    }
}

fn interface_surface(iface: &InterfaceInfo) -> TypeSurface {
    TypeSurface {
        name: iface.name.clone(),
        entry_point: iface.entry_point.unwrap_or(false),
        properties: iface
            .properties
            .iter()
            .flatten()
            .filter_map(|p| p.ty.as_ref().map(|ty| (p.name.clone(), ty.clone())))
            .collect(),
        methods: iface
            .methods
            .iter()
            .flatten()
            .map(|m| {
                (
                    m.name.clone(),
                    m.ret.clone(),
                    m.deprecated.unwrap_or(false),
                )
            })
            .collect(),
    }
}

/// Peel async wrappers with a depth-matched bracket scan:
/// `Promise<Map<string, BlobClient>>` -> `Map<string, BlobClient>`.
pub fn unwrap_async_wrappers(type_text: &str) -> String {
    let mut text = type_text.trim().to_string();
    loop {
        let mut unwrapped = None;
        for wrapper in ASYNC_WRAPPERS {
            let prefix = format!("{wrapper}<");
            if let Some(inner) = text.strip_prefix(&prefix) {
                if let Some(stripped) = inner.strip_suffix('>') {
                    if bracket_balanced(stripped) {
                        unwrapped = Some(stripped.trim().to_string());
                        break;
                    }
                }
            }
        }
        match unwrapped {
            Some(inner) => text = inner,
            None => return text,
        }
    }
}

fn bracket_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Outermost constructor name of a type text (`BlobClient<T>` ->
/// `BlobClient`). Unions, intersections, and structural types have none.
pub fn base_type_name(type_text: &str) -> Option<String> {
    let text = type_text.trim();
    let name: String = text
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    if name.is_empty() {
        return None;
    }
    let rest = &text[name.len()..];
    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('<') {
        Some(name)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::types::{MethodInfo, ModuleInfo, PropertyInfo};

    fn method(name: &str, ret: Option<&str>) -> MethodInfo {
        MethodInfo {
            name: name.to_string(),
            sig: "()".to_string(),
            ret: ret.map(str::to_string),
            ..Default::default()
        }
    }

    fn api() -> ApiIndex {
        ApiIndex {
            package: "pkg".to_string(),
            modules: vec![ModuleInfo {
                name: "index".to_string(),
                classes: Some(vec![
                    ClassInfo {
                        name: "StorageService".to_string(),
                        entry_point: Some(true),
                        methods: Some(vec![method("getBlobClient", Some("BlobClient"))]),
                        ..Default::default()
                    },
                    ClassInfo {
                        name: "BlobClient".to_string(),
                        methods: Some(vec![method("upload", Some("Promise<void>"))]),
                        ..Default::default()
                    },
                    ClassInfo {
                        name: "Helper".to_string(),
                        methods: Some(vec![method("assist", None)]),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_return_type_promotes_clients() {
        let maps = ApiMaps::build(&api());
        assert!(maps.clients.contains("StorageService"));
        assert!(maps.clients.contains("BlobClient"));
        assert!(!maps.clients.contains("Helper"));

        assert_eq!(
            maps.method_return_type_map
                .get("StorageService.getBlobClient")
                .map(String::as_str),
            Some("BlobClient")
        );
    }

    #[test]
    fn test_aggregator_promotion() {
        let mut index = api();
        index.modules[0]
            .classes
            .as_mut()
            .unwrap()
            .push(ClassInfo {
                name: "ServiceHub".to_string(),
                methods: Some(vec![method("describe", None)]),
                properties: Some(vec![PropertyInfo {
                    name: "storage".to_string(),
                    ty: Some("StorageService".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            });

        let maps = ApiMaps::build(&index);
        assert!(maps.clients.contains("ServiceHub"));
        assert_eq!(
            maps.property_type_map
                .get("ServiceHub.storage")
                .map(String::as_str),
            Some("StorageService")
        );
    }

    #[test]
    fn test_unwrap_async_wrappers() {
        assert_eq!(unwrap_async_wrappers("Promise<BlobClient>"), "BlobClient");
        assert_eq!(
            unwrap_async_wrappers("Promise<PromiseLike<Foo>>"),
            "Foo"
        );
        assert_eq!(
            unwrap_async_wrappers("Promise<Map<string, A>>"),
            "Map<string, A>"
        );
        // Unbalanced inner text is left alone.
        assert_eq!(
            unwrap_async_wrappers("Promise<A> | Promise<B>"),
            "Promise<A> | Promise<B>"
        );
    }

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("BlobClient").as_deref(), Some("BlobClient"));
        assert_eq!(base_type_name("Paged<Item>").as_deref(), Some("Paged"));
        assert_eq!(base_type_name("A | B"), None);
        assert_eq!(base_type_name("{ a: 1 }"), None);
    }

    #[test]
    fn test_deprecated_tracking() {
        let mut index = api();
        index.modules[0].classes.as_mut().unwrap()[1]
            .methods
            .as_mut()
            .unwrap()
            .push(MethodInfo {
                name: "legacyUpload".to_string(),
                sig: "()".to_string(),
                deprecated: Some(true),
                ..Default::default()
            });
        let maps = ApiMaps::build(&index);
        assert!(maps
            .deprecated
            .contains(&("BlobClient".to_string(), "legacyUpload".to_string())));
    }
}
