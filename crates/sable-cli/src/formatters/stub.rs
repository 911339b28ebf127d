//! Declaration-stub rendering.
//!
//! Modules group by `(exportPath, condition)`, each group wrapped in a
//! `declare module "pkg[/subpath][/condition]"` block. The condition suffix
//! is omitted when the package has exactly one condition, the subpath suffix
//! when only the root export exists. Dependency blocks come before the main
//! package blocks.

use std::collections::BTreeSet;

use sable_core::types::{
    ApiIndex, ClassInfo, DependencyInfo, EnumInfo, FunctionInfo, InterfaceInfo, ModuleInfo,
    PropertyInfo, TypeAliasInfo,
};

pub fn render_stub(index: &ApiIndex) -> String {
    let mut out = String::new();

    for dependency in index.dependencies.iter().flatten() {
        render_dependency(&mut out, dependency);
    }

    let conditions: BTreeSet<&str> = index
        .modules
        .iter()
        .filter_map(|m| m.condition.as_deref())
        .collect();
    let subpaths: BTreeSet<&str> = index
        .modules
        .iter()
        .filter_map(|m| m.export_path.as_deref())
        .collect();
    let single_condition = conditions.len() <= 1;
    let root_only = subpaths.iter().all(|p| *p == ".");

    for module in &index.modules {
        let mut name = index.package.clone();
        if !root_only {
            if let Some(subpath) = module.export_path.as_deref() {
                if subpath != "." {
                    name.push('/');
                    name.push_str(subpath.trim_start_matches("./"));
                }
            }
        }
        if !single_condition {
            if let Some(condition) = module.condition.as_deref() {
                name.push('/');
                name.push_str(condition);
            }
        }

        out.push_str(&format!("declare module \"{name}\" {{\n"));
        render_module_body(&mut out, module);
        out.push_str("}\n\n");
    }

    out
}

fn render_dependency(out: &mut String, dependency: &DependencyInfo) {
    out.push_str(&format!("declare module \"{}\" {{\n", dependency.package));
    for class in dependency.classes.iter().flatten() {
        render_class(out, class);
    }
    for iface in dependency.interfaces.iter().flatten() {
        render_interface(out, iface);
    }
    for en in dependency.enums.iter().flatten() {
        render_enum(out, en);
    }
    for alias in dependency.types.iter().flatten() {
        render_alias(out, alias);
    }
    out.push_str("}\n\n");
}

fn render_module_body(out: &mut String, module: &ModuleInfo) {
    for class in module.classes.iter().flatten() {
        render_class(out, class);
    }
    for iface in module.interfaces.iter().flatten() {
        render_interface(out, iface);
    }
    for en in module.enums.iter().flatten() {
        render_enum(out, en);
    }
    for alias in module.types.iter().flatten() {
        render_alias(out, alias);
    }
    for func in module.functions.iter().flatten() {
        render_function(out, func);
    }
}

fn type_params(params: &Option<Vec<String>>) -> String {
    match params {
        Some(params) if !params.is_empty() => format!("<{}>", params.join(", ")),
        _ => String::new(),
    }
}

fn render_class(out: &mut String, class: &ClassInfo) {
    let mut header = format!("  export class {}{}", class.name, type_params(&class.type_params));
    if let Some(extends) = &class.extends {
        header.push_str(&format!(" extends {extends}"));
    }
    if let Some(implements) = &class.implements {
        header.push_str(&format!(" implements {}", implements.join(", ")));
    }
    out.push_str(&header);
    out.push_str(" {\n");

    for ctor in class.constructors.iter().flatten() {
        out.push_str(&format!("    constructor{};\n", ctor.sig));
    }
    for prop in class.properties.iter().flatten() {
        render_property(out, prop);
    }
    for sig in class.index_signatures.iter().flatten() {
        out.push_str(&format!(
            "    {}[{}: {}]: {};\n",
            if sig.readonly.unwrap_or(false) { "readonly " } else { "" },
            sig.key_name,
            sig.key_type,
            sig.value_type
        ));
    }
    for method in class.methods.iter().flatten() {
        out.push_str(&format!(
            "    {}{}{}{}{};\n",
            if method.is_static.unwrap_or(false) { "static " } else { "" },
            method.name,
            type_params(&method.type_params),
            method.sig,
            method
                .ret
                .as_deref()
                .map(|r| format!(": {r}"))
                .unwrap_or_default()
        ));
    }
    out.push_str("  }\n");
}

fn render_interface(out: &mut String, iface: &InterfaceInfo) {
    let mut header = format!(
        "  export interface {}{}",
        iface.name,
        type_params(&iface.type_params)
    );
    if let Some(extends) = &iface.extends {
        header.push_str(&format!(" extends {}", extends.join(", ")));
    }
    out.push_str(&header);
    out.push_str(" {\n");

    for prop in iface.properties.iter().flatten() {
        render_property(out, prop);
    }
    for sig in iface.index_signatures.iter().flatten() {
        out.push_str(&format!(
            "    {}[{}: {}]: {};\n",
            if sig.readonly.unwrap_or(false) { "readonly " } else { "" },
            sig.key_name,
            sig.key_type,
            sig.value_type
        ));
    }
    for method in iface.methods.iter().flatten() {
        out.push_str(&format!(
            "    {}{}{}{};\n",
            method.name,
            type_params(&method.type_params),
            method.sig,
            method
                .ret
                .as_deref()
                .map(|r| format!(": {r}"))
                .unwrap_or_default()
        ));
    }
    out.push_str("  }\n");
}

fn render_property(out: &mut String, prop: &PropertyInfo) {
    out.push_str(&format!(
        "    {}{}{}{}{};\n",
        if prop.is_static.unwrap_or(false) { "static " } else { "" },
        if prop.readonly.unwrap_or(false) { "readonly " } else { "" },
        prop.name,
        if prop.optional.unwrap_or(false) { "?" } else { "" },
        prop.ty
            .as_deref()
            .map(|t| format!(": {t}"))
            .unwrap_or_default()
    ));
}

fn render_enum(out: &mut String, en: &EnumInfo) {
    out.push_str(&format!("  export enum {} {{ {} }}\n", en.name, en.values.join(", ")));
}

fn render_alias(out: &mut String, alias: &TypeAliasInfo) {
    out.push_str(&format!(
        "  export type {}{} = {};\n",
        alias.name,
        type_params(&alias.type_params),
        alias.ty
    ));
}

fn render_function(out: &mut String, func: &FunctionInfo) {
    out.push_str(&format!(
        "  export function {}{}{}{};\n",
        func.name,
        type_params(&func.type_params),
        func.sig.as_deref().unwrap_or("()"),
        func.ret
            .as_deref()
            .map(|r| format!(": {r}"))
            .unwrap_or_default()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::types::{MethodInfo, ModuleInfo};

    fn class_module(name: &str, condition: &str, export_path: &str) -> ModuleInfo {
        ModuleInfo {
            name: name.to_string(),
            condition: Some(condition.to_string()),
            export_path: Some(export_path.to_string()),
            classes: Some(vec![ClassInfo {
                name: "C".to_string(),
                methods: Some(vec![MethodInfo {
                    name: "f".to_string(),
                    sig: "()".to_string(),
                    ret: Some("void".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn test_condition_suffix_only_with_multiple_conditions() {
        let index = ApiIndex {
            package: "pkg".to_string(),
            modules: vec![
                class_module("esm/index", "import", "."),
                class_module("cjs/index", "require", "."),
            ],
            ..Default::default()
        };
        let stub = render_stub(&index);
        assert!(stub.contains("declare module \"pkg/import\""));
        assert!(stub.contains("declare module \"pkg/require\""));

        let single = ApiIndex {
            package: "pkg".to_string(),
            modules: vec![class_module("index", "default", ".")],
            ..Default::default()
        };
        let stub = render_stub(&single);
        assert!(stub.contains("declare module \"pkg\""));
        assert!(!stub.contains("pkg/default"));
    }

    #[test]
    fn test_subpath_suffix() {
        let index = ApiIndex {
            package: "pkg".to_string(),
            modules: vec![
                class_module("index", "default", "."),
                class_module("sub", "default", "./sub"),
            ],
            ..Default::default()
        };
        let stub = render_stub(&index);
        assert!(stub.contains("declare module \"pkg\""));
        assert!(stub.contains("declare module \"pkg/sub\""));
    }

    #[test]
    fn test_dependency_blocks_come_first() {
        let index = ApiIndex {
            package: "pkg".to_string(),
            modules: vec![class_module("index", "default", ".")],
            dependencies: Some(vec![DependencyInfo {
                package: "@core/http".to_string(),
                types: Some(vec![TypeAliasInfo {
                    name: "Req".to_string(),
                    ty: "unresolved".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let stub = render_stub(&index);
        let dep_pos = stub.find("@core/http").unwrap();
        let pkg_pos = stub.find("declare module \"pkg\"").unwrap();
        assert!(dep_pos < pkg_pos);
    }
}
