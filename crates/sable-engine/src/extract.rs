//! Entity extraction: lowered declarations become normalized API records.
//!
//! Visibility here is explicit-only: `private` scope and `@internal`/
//! `@hidden` tags exclude a member, `protected` stays, and name prefixes mean
//! nothing. Getters and setters fold into properties, callable interface
//! properties fold into methods, and overload groups keep their first
//! signature (implementation signatures are dropped when overloads exist).

use sable_core::types::{
    ClassInfo, ConstructorInfo, EnumInfo, FunctionInfo, IndexSignatureInfo, InterfaceInfo,
    MethodInfo, ModuleInfo, ParameterInfo, PropertyInfo, TypeAliasInfo,
};

use crate::builtins::BuiltinClassifier;
use crate::collector::RefCollector;
use crate::ir::{
    Accessibility, AliasIr, ClassIr, DeclIr, DocIr, EnumIr, FileIr, FunctionIr, InterfaceIr,
    MethodIr, MethodKind, ParamIr, PropIr, TypeExpr,
};

/// Doc summaries are truncated to this many characters.
const DOC_MAX_CHARS: usize = 120;

/// One extracted entity plus the type names it references.
#[derive(Debug, Clone)]
pub enum EntityRecord {
    Class(ClassInfo),
    Interface(InterfaceInfo),
    Enum(EnumInfo),
    Alias(TypeAliasInfo),
    Function(FunctionInfo),
}

impl EntityRecord {
    pub fn name(&self) -> &str {
        match self {
            EntityRecord::Class(c) => &c.name,
            EntityRecord::Interface(i) => &i.name,
            EntityRecord::Enum(e) => &e.name,
            EntityRecord::Alias(a) => &a.name,
            EntityRecord::Function(f) => &f.name,
        }
    }
}

/// Extract every visible declaration of a file into a module record.
///
/// All named top-level declarations are kept at this stage — non-exported
/// supporting types are pruned later by reachability if nothing points at
/// them.
pub fn extract_module(file: &FileIr, builtins: &BuiltinClassifier) -> ModuleInfo {
    let mut module = ModuleInfo {
        name: file.module_name.clone(),
        ..Default::default()
    };

    let mut collector = RefCollector::new(builtins, file);
    let mut seen_functions: Vec<String> = Vec::new();

    for decl in &file.decls {
        if decl.common().doc.internal {
            continue;
        }
        match decl {
            DeclIr::Class(class) => {
                let info = extract_class(class, file, &mut collector);
                module.classes.get_or_insert_with(Vec::new).push(info);
            }
            DeclIr::Interface(iface) => {
                let info = extract_interface(iface, file, &mut collector);
                module.interfaces.get_or_insert_with(Vec::new).push(info);
            }
            DeclIr::Enum(en) => {
                module
                    .enums
                    .get_or_insert_with(Vec::new)
                    .push(extract_enum(en));
            }
            DeclIr::Alias(alias) => {
                let info = extract_alias(alias, &mut collector);
                module.types.get_or_insert_with(Vec::new).push(info);
            }
            DeclIr::Function(func) => {
                if seen_functions.iter().any(|n| n == &func.common.name) {
                    continue;
                }
                seen_functions.push(func.common.name.clone());
                let overloads: Vec<&FunctionIr> = file
                    .decls
                    .iter()
                    .filter_map(|d| match d {
                        DeclIr::Function(f) if f.common.name == func.common.name => Some(f),
                        _ => None,
                    })
                    .collect();
                let info = extract_function(&overloads, &mut collector);
                module.functions.get_or_insert_with(Vec::new).push(info);
            }
        }
    }

    module
}

/// Extract one declaration in isolation (used for dependency types).
/// Returns the record and its referenced type names.
pub fn extract_decl(
    file: &FileIr,
    decl: &DeclIr,
    builtins: &BuiltinClassifier,
) -> Option<(EntityRecord, Vec<String>)> {
    if decl.common().doc.internal {
        return None;
    }
    let mut collector = RefCollector::new(builtins, file);
    let record = match decl {
        DeclIr::Class(class) => EntityRecord::Class(extract_class(class, file, &mut collector)),
        DeclIr::Interface(iface) => {
            EntityRecord::Interface(extract_interface(iface, file, &mut collector))
        }
        DeclIr::Enum(en) => EntityRecord::Enum(extract_enum(en)),
        DeclIr::Alias(alias) => EntityRecord::Alias(extract_alias(alias, &mut collector)),
        DeclIr::Function(func) => {
            EntityRecord::Function(extract_function(&[func], &mut collector))
        }
    };
    let refs = collector.context_refs(decl.name());
    Some((record, refs))
}

fn extract_class(class: &ClassIr, _file: &FileIr, collector: &mut RefCollector<'_>) -> ClassInfo {
    let common = &class.common;
    collector.push_context(&common.name, &common.type_params);

    if let Some(extends) = &class.extends {
        collector.collect_heritage(extends);
    }
    for implements in &class.implements {
        collector.collect_heritage(implements);
    }

    let (doc, deprecated, deprecation_message) = doc_fields(&common.doc);

    let mut info = ClassInfo {
        name: common.name.clone(),
        extends: class.extends.as_ref().map(|h| h.name.clone()),
        implements: non_empty(class.implements.iter().map(|h| h.name.clone()).collect()),
        type_params: non_empty(common.type_params.clone()),
        doc,
        deprecated,
        deprecation_message,
        ..Default::default()
    };

    // Constructors: visible overload signatures only, first survives.
    let visible_ctors: Vec<_> = class
        .ctors
        .iter()
        .filter(|c| c.accessibility != Some(Accessibility::Private) && !c.doc.internal)
        .collect();
    let ctor_sigs: Vec<&crate::ir::CtorIr> = if visible_ctors.len() > 1 {
        visible_ctors
            .iter()
            .copied()
            .filter(|c| !c.has_body)
            .collect()
    } else {
        visible_ctors.clone()
    };
    if let Some(ctor) = ctor_sigs.first().copied().or_else(|| visible_ctors.first().copied()) {
        collector.collect_params(&ctor.params);
        let (sig, params) = render_params(&ctor.params);
        let (doc, deprecated, deprecation_message) = doc_fields(&ctor.doc);
        info.constructors = Some(vec![ConstructorInfo {
            sig,
            params: non_empty(params),
            doc,
            deprecated,
            deprecation_message,
            ..Default::default()
        }]);
    }

    let (methods, accessor_props) = extract_methods(&class.methods, collector);
    info.methods = non_empty(methods);

    let mut properties: Vec<PropertyInfo> = class
        .props
        .iter()
        .filter(|p| p.accessibility != Some(Accessibility::Private) && !p.doc.internal)
        .map(|p| extract_property(p, collector))
        .collect();
    properties.extend(accessor_props);
    info.properties = non_empty(properties);

    info.index_signatures = non_empty(
        class
            .index_sigs
            .iter()
            .map(|sig| {
                collector.collect_ann(&sig.value);
                IndexSignatureInfo {
                    key_name: sig.key_name.clone(),
                    key_type: sig.key_type.clone(),
                    value_type: clean_type_text(&sig.value.text),
                    readonly: sig.readonly.then_some(true),
                }
            })
            .collect(),
    );

    collector.pop();
    info.referenced_types = non_empty(collector.context_refs(&common.name));
    info
}

fn extract_interface(
    iface: &InterfaceIr,
    _file: &FileIr,
    collector: &mut RefCollector<'_>,
) -> InterfaceInfo {
    let common = &iface.common;
    collector.push_context(&common.name, &common.type_params);

    for extends in &iface.extends {
        collector.collect_heritage(extends);
    }

    let (doc, deprecated, deprecation_message) = doc_fields(&common.doc);
    let mut info = InterfaceInfo {
        name: common.name.clone(),
        extends: non_empty(iface.extends.iter().map(|h| h.name.clone()).collect()),
        type_params: non_empty(common.type_params.clone()),
        doc,
        deprecated,
        deprecation_message,
        ..Default::default()
    };

    let (mut methods, accessor_props) = extract_methods(&iface.methods, collector);

    let mut properties: Vec<PropertyInfo> = Vec::new();
    for prop in &iface.props {
        if prop.doc.internal {
            continue;
        }
        // Callable property signatures fold into methods.
        if let Some(ann) = &prop.ann {
            if let TypeExpr::Function(shape) = &ann.expr {
                collector.collect_ann(ann);
                let (sig, params) = render_params(&shape.params);
                let (doc, deprecated, deprecation_message) = doc_fields(&prop.doc);
                methods.push(MethodInfo {
                    name: prop.name.clone(),
                    sig,
                    params: non_empty(params),
                    ret: shape.ret.as_ref().map(|r| clean_type_text(&r.text)),
                    doc,
                    deprecated,
                    deprecation_message,
                    ..Default::default()
                });
                continue;
            }
        }
        properties.push(extract_property(prop, collector));
    }
    properties.extend(accessor_props);

    info.methods = non_empty(methods);
    info.properties = non_empty(properties);
    info.index_signatures = non_empty(
        iface
            .index_sigs
            .iter()
            .map(|sig| {
                collector.collect_ann(&sig.value);
                IndexSignatureInfo {
                    key_name: sig.key_name.clone(),
                    key_type: sig.key_type.clone(),
                    value_type: clean_type_text(&sig.value.text),
                    readonly: sig.readonly.then_some(true),
                }
            })
            .collect(),
    );

    collector.pop();
    info.referenced_types = non_empty(collector.context_refs(&common.name));
    info
}

/// Extract visible methods; getters/setters come back as synthesized
/// properties (readonly iff no setter exists for the name).
fn extract_methods(
    methods: &[MethodIr],
    collector: &mut RefCollector<'_>,
) -> (Vec<MethodInfo>, Vec<PropertyInfo>) {
    let visible: Vec<&MethodIr> = methods
        .iter()
        .filter(|m| m.accessibility != Some(Accessibility::Private) && !m.doc.internal)
        .collect();

    let mut out_methods: Vec<MethodInfo> = Vec::new();
    let mut out_props: Vec<PropertyInfo> = Vec::new();
    let mut seen: Vec<(String, bool)> = Vec::new();

    for method in &visible {
        match method.kind {
            MethodKind::Getter | MethodKind::Setter => continue,
            MethodKind::Method => {}
        }
        let key = (method.name.clone(), method.is_static);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        let group: Vec<&MethodIr> = visible
            .iter()
            .copied()
            .filter(|m| {
                m.name == method.name
                    && m.is_static == method.is_static
                    && m.kind == MethodKind::Method
            })
            .collect();
        let chosen: &MethodIr = if group.len() > 1 {
            group
                .iter()
                .copied()
                .find(|m| !m.has_body)
                .unwrap_or(group[0])
        } else {
            group[0]
        };

        collector.push_scope(&chosen.type_params);
        collector.collect_params(&chosen.params);
        if let Some(ret) = &chosen.ret {
            collector.collect_ann(ret);
        }
        collector.pop();

        let (sig, params) = render_params(&chosen.params);
        let (doc, deprecated, deprecation_message) = doc_fields(&chosen.doc);
        out_methods.push(MethodInfo {
            name: chosen.name.clone(),
            type_params: non_empty(chosen.type_params.clone()),
            sig,
            params: non_empty(params),
            ret: chosen.ret.as_ref().map(|r| clean_type_text(&r.text)),
            doc,
            deprecated,
            deprecation_message,
            is_async: chosen.is_async.then_some(true),
            is_static: chosen.is_static.then_some(true),
            ..Default::default()
        });
    }

    // Accessors fold into properties.
    let mut accessor_names: Vec<String> = Vec::new();
    for method in &visible {
        if !matches!(method.kind, MethodKind::Getter | MethodKind::Setter) {
            continue;
        }
        if accessor_names.contains(&method.name) {
            continue;
        }
        accessor_names.push(method.name.clone());

        let getter = visible
            .iter()
            .find(|m| m.kind == MethodKind::Getter && m.name == method.name);
        let has_setter = visible
            .iter()
            .any(|m| m.kind == MethodKind::Setter && m.name == method.name);

        let ty = match getter {
            Some(g) => g.ret.as_ref().map(|r| {
                collector.collect_ann(r);
                clean_type_text(&r.text)
            }),
            None => visible
                .iter()
                .find(|m| m.kind == MethodKind::Setter && m.name == method.name)
                .and_then(|s| s.params.first())
                .and_then(|p| p.ann.as_ref())
                .map(|ann| {
                    collector.collect_ann(ann);
                    clean_type_text(&ann.text)
                }),
        };

        let source = getter.unwrap_or(method);
        let (doc, deprecated, deprecation_message) = doc_fields(&source.doc);
        out_props.push(PropertyInfo {
            name: method.name.clone(),
            ty,
            readonly: (!has_setter).then_some(true),
            is_static: source.is_static.then_some(true),
            doc,
            deprecated,
            deprecation_message,
            ..Default::default()
        });
    }

    (out_methods, out_props)
}

fn extract_property(prop: &PropIr, collector: &mut RefCollector<'_>) -> PropertyInfo {
    if let Some(ann) = &prop.ann {
        collector.collect_ann(ann);
    }
    let (doc, deprecated, deprecation_message) = doc_fields(&prop.doc);
    PropertyInfo {
        name: prop.name.clone(),
        ty: prop.ann.as_ref().map(|ann| clean_type_text(&ann.text)),
        optional: prop.optional.then_some(true),
        readonly: prop.readonly.then_some(true),
        is_static: prop.is_static.then_some(true),
        doc,
        deprecated,
        deprecation_message,
        ..Default::default()
    }
}

fn extract_enum(en: &EnumIr) -> EnumInfo {
    let (doc, deprecated, deprecation_message) = doc_fields(&en.common.doc);
    EnumInfo {
        name: en.common.name.clone(),
        doc,
        deprecated,
        deprecation_message,
        values: en.members.clone(),
        ..Default::default()
    }
}

fn extract_alias(alias: &AliasIr, collector: &mut RefCollector<'_>) -> TypeAliasInfo {
    let common = &alias.common;
    collector.push_context(&common.name, &common.type_params);
    collector.collect_ann(&alias.ann);
    collector.pop();

    let (doc, deprecated, deprecation_message) = doc_fields(&common.doc);
    TypeAliasInfo {
        name: common.name.clone(),
        type_params: non_empty(common.type_params.clone()),
        doc,
        deprecated,
        deprecation_message,
        ty: clean_type_text(&alias.ann.text),
        referenced_types: non_empty(collector.context_refs(&common.name)),
        ..Default::default()
    }
}

/// Build a function record from its overload group; the implementation
/// signature is skipped when overload signatures exist.
fn extract_function(overloads: &[&FunctionIr], collector: &mut RefCollector<'_>) -> FunctionInfo {
    let chosen = if overloads.len() > 1 {
        overloads
            .iter()
            .find(|f| !f.has_body)
            .copied()
            .unwrap_or(overloads[0])
    } else {
        overloads[0]
    };
    let common = &chosen.common;

    collector.push_context(&common.name, &common.type_params);
    collector.collect_params(&chosen.params);
    if let Some(ret) = &chosen.ret {
        collector.collect_ann(ret);
    }
    collector.pop();

    let (sig, params) = render_params(&chosen.params);
    let (doc, deprecated, deprecation_message) = doc_fields(&common.doc);
    FunctionInfo {
        name: common.name.clone(),
        type_params: non_empty(common.type_params.clone()),
        sig: Some(sig),
        params: non_empty(params),
        ret: chosen.ret.as_ref().map(|r| clean_type_text(&r.text)),
        is_async: chosen.is_async.then_some(true),
        doc,
        deprecated,
        deprecation_message,
        referenced_types: non_empty(collector.context_refs(&common.name)),
        ..Default::default()
    }
}

/// Render `name[?]: type` parameters and the parenthesized signature string.
fn render_params(params: &[ParamIr]) -> (String, Vec<ParameterInfo>) {
    let mut rendered = Vec::new();
    let mut infos = Vec::new();

    for param in params {
        let ty = param
            .ann
            .as_ref()
            .map(|ann| clean_type_text(&ann.text))
            .unwrap_or_else(|| "any".to_string());

        let mut piece = String::new();
        if param.rest {
            piece.push_str("...");
        }
        piece.push_str(&param.name);
        if param.optional {
            piece.push('?');
        }
        piece.push_str(": ");
        piece.push_str(&ty);
        rendered.push(piece);

        infos.push(ParameterInfo {
            name: param.name.clone(),
            ty,
            default: param.default.clone(),
            optional: param.optional.then_some(true),
            rest: param.rest.then_some(true),
        });
    }

    (format!("({})", rendered.join(", ")), infos)
}

/// Strip compiler-style `import("...")` qualifiers from a rendered type.
///
/// `import("/p/q").T` becomes `T`; `typeof import("/p/q")` becomes
/// `typeof q` (last path segment).
pub fn clean_type_text(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find("import(") {
        let before = &rest[..pos];
        let after_open = &rest[pos + "import(".len()..];
        let Some(close) = after_open.find(')') else {
            out.push_str(&rest[..pos + "import(".len()]);
            rest = after_open;
            continue;
        };

        let path = after_open[..close].trim().trim_matches('"').trim_matches('\'');
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        let after = &after_open[close + 1..];

        out.push_str(before);
        if let Some(member) = after.strip_prefix('.') {
            // `import("p").T` -> `T`
            rest = member;
        } else if before.trim_end().ends_with("typeof") {
            // `typeof import("p")` -> `typeof p`
            out.push_str(last_segment);
            rest = after;
        } else {
            out.push_str(last_segment);
            rest = after;
        }
    }

    out.push_str(rest);
    out
}

/// First doc line truncated with an ellipsis, plus the deprecation pair.
fn doc_fields(doc: &DocIr) -> (Option<String>, Option<bool>, Option<String>) {
    let summary = doc.summary.as_ref().map(|s| truncate_doc(s));
    let deprecated = doc.deprecated.then_some(true);
    (summary, deprecated, doc.deprecation_message.clone())
}

fn truncate_doc(text: &str) -> String {
    if text.chars().count() <= DOC_MAX_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(DOC_MAX_CHARS).collect();
    out.push('…');
    out
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
    use std::path::Path;

    fn module_for(src: &str) -> ModuleInfo {
        let file = lower_source(src, Path::new("src/index.ts"), "src/index".to_string()).unwrap();
        extract_module(&file, &BuiltinClassifier::new())
    }

    #[test]
    fn test_class_extraction() {
        let module = module_for(
            r#"
/** Storage access client. */
export declare class StorageService {
    constructor(url: string, options?: ClientOptions);
    /** Returns a blob client. */
    getBlobClient(name: string): BlobClient;
    private cache: Map<string, BlobClient>;
    protected retries: number;
}
"#,
        );
        let classes = module.classes.unwrap();
        assert_eq!(classes.len(), 1);
        let class = &classes[0];
        assert_eq!(class.name, "StorageService");
        assert_eq!(class.doc.as_deref(), Some("Storage access client."));

        let ctor = &class.constructors.as_ref().unwrap()[0];
        assert_eq!(ctor.sig, "(url: string, options?: ClientOptions)");

        let methods = class.methods.as_ref().unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].sig, "(name: string)");
        assert_eq!(methods[0].ret.as_deref(), Some("BlobClient"));

        // private members are filtered, protected stay.
        let props = class.properties.as_ref().unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "retries");

        let refs = class.referenced_types.as_ref().unwrap();
        assert!(refs.contains(&"BlobClient".to_string()));
        assert!(refs.contains(&"ClientOptions".to_string()));
        // Map is a builtin, never referenced.
        assert!(!refs.contains(&"Map".to_string()));
    }

    #[test]
    fn test_getter_setter_folding() {
        let module = module_for(
            r#"
export declare class Config {
    get timeout(): number;
    set timeout(value: number);
    get endpoint(): Endpoint;
}
"#,
        );
        let class = &module.classes.unwrap()[0];
        assert!(class.methods.is_none());
        let props = class.properties.as_ref().unwrap();

        let timeout = props.iter().find(|p| p.name == "timeout").unwrap();
        assert_eq!(timeout.ty.as_deref(), Some("number"));
        assert!(timeout.readonly.is_none());

        let endpoint = props.iter().find(|p| p.name == "endpoint").unwrap();
        assert_eq!(endpoint.readonly, Some(true));
        assert_eq!(endpoint.ty.as_deref(), Some("Endpoint"));
    }

    #[test]
    fn test_interface_callable_property_folds_into_methods() {
        let module = module_for(
            r#"
export interface Hooks {
    onRetry: (attempt: number) => RetryDecision;
    name: string;
}
"#,
        );
        let iface = &module.interfaces.unwrap()[0];
        let methods = iface.methods.as_ref().unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "onRetry");
        assert_eq!(methods[0].ret.as_deref(), Some("RetryDecision"));

        let props = iface.properties.as_ref().unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "name");
    }

    #[test]
    fn test_internal_declarations_are_skipped() {
        let module = module_for(
            r#"
/** @internal */
export declare class Secret {}
export declare class Visible {}
"#,
        );
        let classes = module.classes.unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "Visible");
    }

    #[test]
    fn test_function_overloads_skip_implementation() {
        let module = module_for(
            r#"
export function parse(input: string): Tree;
export function parse(input: Uint8Array): Tree;
export function parse(input: string | Uint8Array): Tree {
    return inner(input);
}
"#,
        );
        let functions = module.functions.unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].sig.as_deref(), Some("(input: string)"));
    }

    #[test]
    fn test_enum_values_in_order() {
        let module = module_for("export enum Level { Debug, Info, Warn, Error }");
        let enums = module.enums.unwrap();
        assert_eq!(enums[0].values, vec!["Debug", "Info", "Warn", "Error"]);
    }

    #[test]
    fn test_deprecated_method() {
        let module = module_for(
            r#"
export declare class BlobClient {
    upload(data: Uint8Array): Promise<void>;
    /** @deprecated use upload instead */
    legacyUpload(data: Uint8Array): Promise<void>;
}
"#,
        );
        let class = &module.classes.unwrap()[0];
        let methods = class.methods.as_ref().unwrap();
        let legacy = methods.iter().find(|m| m.name == "legacyUpload").unwrap();
        assert_eq!(legacy.deprecated, Some(true));
        assert_eq!(legacy.deprecation_message.as_deref(), Some("use upload instead"));
    }

    #[test]
    fn test_clean_type_text() {
        assert_eq!(clean_type_text("import(\"/p/q\").T"), "T");
        assert_eq!(clean_type_text("typeof import(\"/p/q\")"), "typeof q");
        assert_eq!(
            clean_type_text("Map<string, import(\"/a/b\").Widget>"),
            "Map<string, Widget>"
        );
        assert_eq!(clean_type_text("Plain<T>"), "Plain<T>");
    }

    #[test]
    fn test_doc_truncation() {
        let long = "x".repeat(200);
        let out = truncate_doc(&long);
        assert_eq!(out.chars().count(), DOC_MAX_CHARS + 1);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_rest_and_default_params() {
        let module = module_for(
            "export declare function join(sep?: string, ...parts: string[]): string;",
        );
        let func = &module.functions.unwrap()[0];
        assert_eq!(func.sig.as_deref(), Some("(sep?: string, ...parts: string[])"));
        let params = func.params.as_ref().unwrap();
        assert_eq!(params[0].optional, Some(true));
        assert_eq!(params[1].rest, Some(true));
    }
}
