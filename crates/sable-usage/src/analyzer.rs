//! Sample-code usage analysis.
//!
//! Samples are parsed, never type-checked: local variable types are inferred
//! from the API-derived maps alone, then every call expression is attributed
//! to a `(client, method)` pair or counted unresolved. Pattern detection is
//! purely structural — `await` expressions, `try` statements, awaited
//! `for..of` loops — with no identifier keyword matching.

use std::collections::BTreeSet;
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::SourceType;
use rustc_hash::FxHashMap;
use sable_core::types::{ApiIndex, OperationRef, UsageIndex};
use sable_core::{CancellationToken, Result};
use walkdir::WalkDir;

use crate::maps::ApiMaps;

/// Sample file extensions considered for analysis.
const SAMPLE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "js", "mjs", "cjs"];

/// Analyze every sample under `samples_dir` against the API surface.
pub fn analyze_usage(
    api: &ApiIndex,
    samples_dir: &Path,
    cancel: &CancellationToken,
) -> Result<UsageIndex> {
    let maps = ApiMaps::build(api);

    let mut covered: BTreeSet<(String, String)> = BTreeSet::new();
    let mut file_count = 0usize;
    let mut has_async = false;
    let mut has_error_handling = false;
    let mut has_streaming = false;
    let mut unresolved = 0usize;

    for entry in WalkDir::new(samples_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules")
        .filter_map(|e| e.ok())
    {
        cancel.check()?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(".d.ts") {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !SAMPLE_EXTENSIONS.contains(&ext) {
            continue;
        }

        let source = std::fs::read_to_string(path)?;
        let outcome = analyze_file(&maps, &source, path);
        file_count += 1;
        covered.extend(outcome.covered);
        has_async |= outcome.has_async;
        has_error_handling |= outcome.has_error_handling;
        has_streaming |= outcome.has_streaming;
        unresolved += outcome.unresolved;
    }
    if unresolved > 0 {
        tracing::debug!(unresolved, "call expressions could not be attributed");
    }

    // Coverage through an interface counts for its implementers and back.
    mirror_interface_coverage(&maps, &mut covered);

    let mut covered_operations: Vec<OperationRef> = covered
        .iter()
        .map(|(t, m)| OperationRef::new(t.clone(), m.clone()))
        .collect();
    covered_operations.sort();

    let mut uncovered_operations: Vec<OperationRef> = Vec::new();
    for (type_name, methods) in &maps.methods_by_type {
        if !maps.clients.contains(type_name) {
            continue;
        }
        for method in methods {
            if !covered.contains(&(type_name.clone(), method.clone())) {
                uncovered_operations.push(OperationRef::new(type_name.clone(), method.clone()));
            }
        }
    }
    uncovered_operations.sort();

    let mut patterns = Vec::new();
    if has_async {
        patterns.push("async".to_string());
    }
    if has_error_handling {
        patterns.push("error-handling".to_string());
    }
    if has_streaming {
        patterns.push("streaming".to_string());
    }

    Ok(UsageIndex {
        file_count,
        covered_operations,
        uncovered_operations,
        patterns,
    })
}

fn mirror_interface_coverage(maps: &ApiMaps, covered: &mut BTreeSet<(String, String)>) {
    let mut additions: Vec<(String, String)> = Vec::new();
    for (type_name, method) in covered.iter() {
        if let Some(classes) = maps.implementers.get(type_name) {
            for class in classes {
                if maps.declares(class, method) {
                    additions.push((class.clone(), method.clone()));
                }
            }
        }
        if let Some(interfaces) = maps.interfaces_of.get(type_name) {
            for iface in interfaces {
                if maps.declares(iface, method) {
                    additions.push((iface.clone(), method.clone()));
                }
            }
        }
    }
    covered.extend(additions);
}

struct FileOutcome {
    covered: BTreeSet<(String, String)>,
    has_async: bool,
    has_error_handling: bool,
    has_streaming: bool,
    unresolved: usize,
}

fn analyze_file(maps: &ApiMaps, source: &str, path: &Path) -> FileOutcome {
    let empty = FileOutcome {
        covered: BTreeSet::new(),
        has_async: false,
        has_error_handling: false,
        has_streaming: false,
        unresolved: 0,
    };

    let allocator = Allocator::default();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let source_type = SourceType::from_path(path)
        .unwrap_or_default()
        .with_typescript(true)
        .with_jsx(ext == "tsx" || ext == "jsx");
    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked {
        tracing::warn!(path = %path.display(), "sample failed to parse, skipping");
        return empty;
    }

    // Pass 1: bind local variable types from structural evidence.
    let mut binder = TypeBinder {
        maps,
        var_types: FxHashMap::default(),
    };
    binder.visit_program(&ret.program);

    // Pass 2: attribute call expressions and detect patterns.
    let mut scanner = CallScanner {
        maps,
        var_types: &binder.var_types,
        outcome: empty,
    };
    scanner.visit_program(&ret.program);
    scanner.outcome
}

/// Pass 1: `varTypes` construction.
struct TypeBinder<'m> {
    maps: &'m ApiMaps,
    /// Local name (or `this.field`) -> client type name.
    var_types: FxHashMap<String, String>,
}

impl<'a, 'm> Visit<'a> for TypeBinder<'m> {
    /// Annotated parameters carry explicit structural evidence too.
    fn visit_formal_parameter(&mut self, param: &FormalParameter<'a>) {
        if let BindingPatternKind::BindingIdentifier(id) = &param.pattern.kind {
            if let Some(ann) = &param.pattern.type_annotation {
                if let Some(client) = annotation_client(self.maps, &ann.type_annotation) {
                    self.var_types.insert(id.name.to_string(), client);
                }
            }
        }
        walk::walk_formal_parameter(self, param);
    }

    fn visit_variable_declarator(&mut self, decl: &VariableDeclarator<'a>) {
        if let BindingPatternKind::BindingIdentifier(id) = &decl.id.kind {
            let inferred = decl
                .id
                .type_annotation
                .as_ref()
                .and_then(|ann| annotation_client(self.maps, &ann.type_annotation))
                .or_else(|| {
                    decl.init
                        .as_ref()
                        .and_then(|init| expr_type(self.maps, &self.var_types, init))
                });
            if let Some(client) = inferred {
                self.var_types.insert(id.name.to_string(), client);
            }
        }
        walk::walk_variable_declarator(self, decl);
    }

    /// Class-field bootstrap: `private client: BlobClient` or
    /// `client = new BlobClient()` enable `this.client.op()` attribution.
    fn visit_property_definition(&mut self, def: &PropertyDefinition<'a>) {
        if let Some(name) = property_key_name(&def.key) {
            let inferred = def
                .type_annotation
                .as_ref()
                .and_then(|ann| annotation_client(self.maps, &ann.type_annotation))
                .or_else(|| {
                    def.value
                        .as_ref()
                        .and_then(|value| expr_type(self.maps, &self.var_types, value))
                });
            if let Some(client) = inferred {
                self.var_types.insert(format!("this.{name}"), client);
            }
        }
        walk::walk_property_definition(self, def);
    }
}

/// Pass 2: call attribution plus structural pattern flags.
struct CallScanner<'m> {
    maps: &'m ApiMaps,
    var_types: &'m FxHashMap<String, String>,
    outcome: FileOutcome,
}

impl<'a, 'm> Visit<'a> for CallScanner<'m> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::StaticMemberExpression(member) = &call.callee {
            let method = member.property.name.to_string();
            match self.receiver_type(&member.object) {
                Some(client) if self.maps.declares(&client, &method) => {
                    self.outcome.covered.insert((client, method));
                }
                _ => self.outcome.unresolved += 1,
            }
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_await_expression(&mut self, expr: &AwaitExpression<'a>) {
        self.outcome.has_async = true;
        walk::walk_await_expression(self, expr);
    }

    fn visit_try_statement(&mut self, stmt: &TryStatement<'a>) {
        self.outcome.has_error_handling = true;
        walk::walk_try_statement(self, stmt);
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        if stmt.r#await {
            self.outcome.has_streaming = true;
        }
        walk::walk_for_of_statement(self, stmt);
    }
}

impl<'m> CallScanner<'m> {
    /// Static type of a call receiver, from varTypes and the API maps only.
    fn receiver_type(&self, object: &Expression<'_>) -> Option<String> {
        object_type(self.maps, self.var_types, object)
    }
}

/// Static type of an expression used as a receiver: a typed local, a client
/// type literal, a `this.field` / `var.field` access, or a one-level call
/// unwrap through the return-type maps.
fn object_type(
    maps: &ApiMaps,
    var_types: &FxHashMap<String, String>,
    object: &Expression<'_>,
) -> Option<String> {
    match object {
        Expression::Identifier(ident) => {
            let name = ident.name.as_str();
            var_types.get(name).cloned().or_else(|| {
                // Static access on a type literal.
                maps.methods_by_type
                    .contains_key(name)
                    .then(|| name.to_string())
            })
        }
        // `ident.field` / `this.field` / deeper member chains.
        Expression::StaticMemberExpression(inner) => {
            let field = inner.property.name.as_str();
            match &inner.object {
                Expression::ThisExpression(_) => {
                    var_types.get(&format!("this.{field}")).cloned()
                }
                other => object_type(maps, var_types, other)
                    .and_then(|t| {
                        maps.property_type_map
                            .get(&format!("{t}.{field}"))
                            .cloned()
                    })
                    .or_else(|| var_types.get(field).cloned()),
            }
        }
        // `f(...)` / `obj.f(...)`: one-level unwrap.
        Expression::CallExpression(inner) => call_result_type(maps, var_types, inner),
        Expression::AwaitExpression(inner) => object_type(maps, var_types, &inner.argument),
        Expression::ParenthesizedExpression(inner) => {
            object_type(maps, var_types, &inner.expression)
        }
        Expression::TSNonNullExpression(inner) => {
            object_type(maps, var_types, &inner.expression)
        }
        _ => None,
    }
}

/// Client named by an explicit type annotation.
fn annotation_client(maps: &ApiMaps, ty: &TSType<'_>) -> Option<String> {
    let name = ts_reference_name(ty)?;
    maps.clients.contains(&name).then_some(name)
}

fn ts_reference_name(ty: &TSType<'_>) -> Option<String> {
    match ty {
        TSType::TSTypeReference(reference) => match &reference.type_name {
            TSTypeName::IdentifierReference(id) => Some(id.name.to_string()),
            _ => None,
        },
        _ => None,
    }
}

/// Structural type of an initializer expression (varTypes rules 2-5).
fn expr_type(
    maps: &ApiMaps,
    var_types: &FxHashMap<String, String>,
    expr: &Expression<'_>,
) -> Option<String> {
    match expr {
        // `new Name(...)` / `new ns.Name(...)`
        Expression::NewExpression(new_expr) => {
            let name = match &new_expr.callee {
                Expression::Identifier(id) => Some(id.name.to_string()),
                Expression::StaticMemberExpression(member) => {
                    Some(member.property.name.to_string())
                }
                _ => None,
            }?;
            maps.clients.contains(&name).then_some(name)
        }

        Expression::CallExpression(call) => call_result_type(maps, var_types, call),

        // `expr as TypeName`
        Expression::TSAsExpression(as_expr) => {
            annotation_client(maps, &as_expr.type_annotation)
        }

        // `obj.prop` sub-client access.
        Expression::StaticMemberExpression(member) => {
            let prop = member.property.name.as_str();
            match &member.object {
                Expression::Identifier(obj) => var_types
                    .get(obj.name.as_str())
                    .and_then(|t| maps.property_type_map.get(&format!("{t}.{prop}")).cloned()),
                Expression::ThisExpression(_) => {
                    var_types.get(&format!("this.{prop}")).cloned()
                }
                _ => None,
            }
        }

        Expression::AwaitExpression(inner) => expr_type(maps, var_types, &inner.argument),
        Expression::ParenthesizedExpression(inner) => {
            expr_type(maps, var_types, &inner.expression)
        }
        Expression::TSNonNullExpression(inner) => expr_type(maps, var_types, &inner.expression),

        _ => None,
    }
}

/// Result type of a call, used both for varTypes and one-level receiver
/// unwrapping.
fn call_result_type(
    maps: &ApiMaps,
    var_types: &FxHashMap<String, String>,
    call: &CallExpression<'_>,
) -> Option<String> {
    match &call.callee {
        // Plain function call.
        Expression::Identifier(func) => maps
            .function_return_type_map
            .get(func.name.as_str())
            .cloned(),

        Expression::StaticMemberExpression(member) => {
            let method = member.property.name.as_str();
            match &member.object {
                Expression::Identifier(obj)
                    if var_types.get(obj.name.as_str()).is_none()
                        && maps.methods_by_type.contains_key(obj.name.as_str()) =>
                {
                    // Static factory on the type literal itself; without a
                    // mapped return the receiver type stands.
                    let name = obj.name.as_str();
                    maps.method_return_type_map
                        .get(&format!("{name}.{method}"))
                        .cloned()
                        .or_else(|| maps.clients.contains(name).then(|| name.to_string()))
                }
                other => object_type(maps, var_types, other).and_then(|t| {
                    maps.method_return_type_map
                        .get(&format!("{t}.{method}"))
                        .cloned()
                }),
            }
        }
        _ => None,
    }
}

/// Non-computed property key name.
fn property_key_name(key: &PropertyKey<'_>) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
        _ => None,
    }
}
