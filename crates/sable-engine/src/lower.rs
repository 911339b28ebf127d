//! Parse one source file with oxc and lower it into the owned IR.
//!
//! Only the top-level declaration surface matters here: exported classes,
//! interfaces, enums, type aliases, functions, plus the import/export graph.
//! Function bodies are never descended into.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast::match_ts_type;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::ir::{
    Accessibility, AliasIr, ClassIr, CtorIr, DeclCommon, DeclIr, DocIr, EnumIr, FileIr,
    FunctionIr, FunctionShape, HeritageRef, ImportIr, IndexSigIr, InterfaceIr, MethodIr,
    MethodKind, ObjectProp, ObjectShape, ParamIr, PropIr, ReexportIr, TypeAnn, TypeExpr,
};

/// Parse and lower one file. `Err` carries a short reason when the parser
/// gave up entirely; recoverable parse errors still produce an IR.
pub fn lower_source(source: &str, path: &Path, module_name: String) -> Result<FileIr, String> {
    let allocator = Allocator::default();

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let source_type = SourceType::from_path(path)
        .unwrap_or_default()
        .with_typescript(true)
        .with_jsx(ext == "tsx" || ext == "jsx");

    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked {
        let first = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser panicked".to_string());
        return Err(first);
    }

    let comments = CommentMap::new(&ret.program, source);
    let mut lowerer = Lowerer {
        src: source,
        comments,
        file: FileIr {
            path: path.to_path_buf(),
            module_name,
            ..Default::default()
        },
    };
    lowerer.lower_program(&ret.program);

    let mut file = lowerer.file;
    // `export { A as B }` marks declarations exported after the fact.
    let aliased: Vec<String> = file.export_aliases.iter().map(|(l, _)| l.clone()).collect();
    for decl in &mut file.decls {
        if aliased.iter().any(|l| l == &decl.common().name) {
            decl.common_mut().exported = true;
        }
    }
    Ok(file)
}

/// Doc comments indexed by position, resolved against the source text.
struct CommentMap {
    /// `(start, end)` of every block comment, in source order.
    blocks: Vec<(u32, u32)>,
}

impl CommentMap {
    fn new(program: &Program<'_>, src: &str) -> Self {
        let mut blocks = Vec::new();
        for comment in &program.comments {
            let start = comment.span.start as usize;
            if src[start..].starts_with("/**") || src.get(start..start + 1) == Some("*") {
                blocks.push((comment.span.start, comment.span.end));
            }
        }
        Self { blocks }
    }

    /// Doc facts for the declaration starting at `decl_start`: the closest
    /// preceding block comment separated only by whitespace and declaration
    /// modifiers (`export declare class ...` anchors its span at `class`).
    fn doc_for(&self, decl_start: u32, src: &str) -> DocIr {
        let mut best: Option<(u32, u32)> = None;
        for &(start, end) in &self.blocks {
            if end <= decl_start {
                let between = &src[end as usize..decl_start as usize];
                let only_modifiers = between.split_whitespace().all(|word| {
                    matches!(word, "export" | "declare" | "default" | "abstract" | "async")
                });
                if only_modifiers {
                    best = Some((start, end));
                }
            } else {
                break;
            }
        }
        match best {
            Some((start, end)) => parse_doc(&src[start as usize..end as usize]),
            None => DocIr::default(),
        }
    }
}

/// Parse a raw `/** ... */` comment into doc facts.
fn parse_doc(raw: &str) -> DocIr {
    let body = raw
        .trim_start_matches("/**")
        .trim_start_matches("/*")
        .trim_end_matches("*/");

    let mut doc = DocIr::default();
    for line in body.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("@deprecated") {
            doc.deprecated = true;
            let message = rest.trim();
            if !message.is_empty() {
                doc.deprecation_message = Some(message.to_string());
            }
            continue;
        }
        if line.starts_with("@internal") || line.starts_with("@hidden") {
            doc.internal = true;
            continue;
        }
        if line.starts_with('@') {
            continue;
        }
        if doc.summary.is_none() {
            doc.summary = Some(line.to_string());
        }
    }
    doc
}

struct Lowerer<'s> {
    src: &'s str,
    comments: CommentMap,
    file: FileIr,
}

impl<'s> Lowerer<'s> {
    fn slice(&self, span: Span) -> &'s str {
        &self.src[span.start as usize..span.end as usize]
    }

    fn doc(&self, start: u32) -> DocIr {
        self.comments.doc_for(start, self.src)
    }

    fn lower_program(&mut self, program: &Program<'_>) {
        for stmt in &program.body {
            match stmt {
                Statement::ImportDeclaration(decl) => self.lower_import(decl),
                Statement::ExportNamedDeclaration(decl) => self.lower_export_named(decl),
                Statement::ExportAllDeclaration(decl) => {
                    self.file.reexports.push(ReexportIr {
                        source: decl.source.value.to_string(),
                        names: Vec::new(),
                        is_star: true,
                    });
                }
                Statement::ExportDefaultDeclaration(decl) => self.lower_export_default(decl),
                Statement::ClassDeclaration(c) => self.lower_class(c, false),
                Statement::FunctionDeclaration(f) => self.lower_function(f, false),
                Statement::TSTypeAliasDeclaration(a) => self.lower_alias(a, false),
                Statement::TSInterfaceDeclaration(i) => self.lower_interface(i, false),
                Statement::TSEnumDeclaration(e) => self.lower_enum(e, false),
                Statement::VariableDeclaration(v) => self.lower_variable(v, false),
                _ => {}
            }
        }
    }

    fn lower_import(&mut self, decl: &ImportDeclaration<'_>) {
        let mut entry = ImportIr {
            source: decl.source.value.to_string(),
            type_only: matches!(decl.import_kind, ImportOrExportKind::Type),
            ..Default::default()
        };

        if let Some(specifiers) = &decl.specifiers {
            for spec in specifiers {
                match spec {
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        entry.default_local = Some(s.local.name.to_string());
                    }
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        entry.named.push((
                            module_export_name(&s.imported),
                            s.local.name.to_string(),
                        ));
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        entry.namespace_local = Some(s.local.name.to_string());
                    }
                }
            }
        }
        self.file.imports.push(entry);
    }

    fn lower_export_named(&mut self, decl: &ExportNamedDeclaration<'_>) {
        if let Some(source) = &decl.source {
            let names = decl
                .specifiers
                .iter()
                .map(|s| (module_export_name(&s.local), module_export_name(&s.exported)))
                .collect();
            self.file.reexports.push(ReexportIr {
                source: source.value.to_string(),
                names,
                is_star: false,
            });
            return;
        }

        if let Some(declaration) = &decl.declaration {
            self.lower_declaration(declaration, true);
        }
        for spec in &decl.specifiers {
            self.file
                .export_aliases
                .push((module_export_name(&spec.local), module_export_name(&spec.exported)));
        }
    }

    fn lower_export_default(&mut self, decl: &ExportDefaultDeclaration<'_>) {
        match &decl.declaration {
            ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                if c.id.is_some() {
                    self.lower_class(c, true);
                    let name = self.file.decls.last().map(|d| d.name().to_string());
                    if let Some(name) = name {
                        self.file.export_aliases.push((name, "default".to_string()));
                    }
                }
            }
            ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                if f.id.is_some() {
                    self.lower_function(f, true);
                    let name = self.file.decls.last().map(|d| d.name().to_string());
                    if let Some(name) = name {
                        self.file.export_aliases.push((name, "default".to_string()));
                    }
                }
            }
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(i) => {
                self.lower_interface(i, true);
                let name = i.id.name.to_string();
                self.file.export_aliases.push((name, "default".to_string()));
            }
            _ => {}
        }
    }

    fn lower_declaration(&mut self, decl: &Declaration<'_>, exported: bool) {
        match decl {
            Declaration::ClassDeclaration(c) => self.lower_class(c, exported),
            Declaration::FunctionDeclaration(f) => self.lower_function(f, exported),
            Declaration::TSTypeAliasDeclaration(a) => self.lower_alias(a, exported),
            Declaration::TSInterfaceDeclaration(i) => self.lower_interface(i, exported),
            Declaration::TSEnumDeclaration(e) => self.lower_enum(e, exported),
            Declaration::VariableDeclaration(v) => self.lower_variable(v, exported),
            _ => {}
        }
    }

    fn lower_class(&mut self, class: &Class<'_>, exported: bool) {
        let Some(id) = &class.id else { return };

        let common = DeclCommon {
            name: id.name.to_string(),
            exported,
            doc: self.doc(class.span.start),
            type_params: self.lower_type_params(class.type_parameters.as_deref()),
        };

        let extends = class.super_class.as_ref().map(|sup| HeritageRef {
            name: self.slice(sup.span()).to_string(),
            args: class
                .super_type_arguments
                .as_ref()
                .map(|ta| ta.params.iter().map(|t| self.lower_type(t)).collect())
                .unwrap_or_default(),
        });

        let implements = class
            .implements
            .iter()
            .map(|imp| HeritageRef {
                name: ts_type_name_text(&imp.expression),
                args: imp
                    .type_arguments
                    .as_ref()
                    .map(|ta| ta.params.iter().map(|t| self.lower_type(t)).collect())
                    .unwrap_or_default(),
            })
            .collect();

        let mut out = ClassIr {
            common,
            extends,
            implements,
            ctors: Vec::new(),
            methods: Vec::new(),
            props: Vec::new(),
            index_sigs: Vec::new(),
        };

        for element in &class.body.body {
            match element {
                ClassElement::MethodDefinition(m) => self.lower_class_method(m, &mut out),
                ClassElement::PropertyDefinition(p) => {
                    let Some(name) = property_key_name(&p.key) else { continue };
                    out.props.push(PropIr {
                        name,
                        ann: p
                            .type_annotation
                            .as_ref()
                            .map(|ann| self.lower_ann(&ann.type_annotation)),
                        optional: p.optional,
                        readonly: p.readonly,
                        is_static: p.r#static,
                        accessibility: accessibility_of(p.accessibility),
                        doc: self.doc(p.span.start),
                    });
                }
                ClassElement::TSIndexSignature(sig) => {
                    if let Some(index) = self.lower_index_signature(sig) {
                        out.index_sigs.push(index);
                    }
                }
                _ => {}
            }
        }

        self.file.decls.push(DeclIr::Class(out));
    }

    fn lower_class_method(&mut self, m: &MethodDefinition<'_>, out: &mut ClassIr) {
        let doc = self.doc(m.span.start);
        let func = &m.value;
        let params = self.lower_params(&func.params);

        if matches!(m.kind, MethodDefinitionKind::Constructor) {
            out.ctors.push(CtorIr {
                params,
                doc,
                accessibility: accessibility_of(m.accessibility),
                has_body: func.body.is_some(),
            });
            return;
        }

        let Some(name) = property_key_name(&m.key) else { return };
        let kind = match m.kind {
            MethodDefinitionKind::Get => MethodKind::Getter,
            MethodDefinitionKind::Set => MethodKind::Setter,
            _ => MethodKind::Method,
        };

        out.methods.push(MethodIr {
            name,
            kind,
            type_params: self.lower_type_params(func.type_parameters.as_deref()),
            params,
            ret: func
                .return_type
                .as_ref()
                .map(|ret| self.lower_ann(&ret.type_annotation)),
            doc,
            is_static: m.r#static,
            is_async: func.r#async,
            optional: m.optional,
            accessibility: accessibility_of(m.accessibility),
            has_body: func.body.is_some(),
        });
    }

    fn lower_interface(&mut self, iface: &TSInterfaceDeclaration<'_>, exported: bool) {
        let common = DeclCommon {
            name: iface.id.name.to_string(),
            exported,
            doc: self.doc(iface.span.start),
            type_params: self.lower_type_params(iface.type_parameters.as_deref()),
        };

        let extends = iface
            .extends
            .iter()
            .map(|ext| HeritageRef {
                name: self.slice(ext.expression.span()).to_string(),
                args: ext
                    .type_arguments
                    .as_ref()
                    .map(|ta| ta.params.iter().map(|t| self.lower_type(t)).collect())
                    .unwrap_or_default(),
            })
            .collect();

        let mut out = InterfaceIr {
            common,
            extends,
            methods: Vec::new(),
            props: Vec::new(),
            index_sigs: Vec::new(),
        };

        for member in &iface.body.body {
            self.lower_signature(member, &mut out);
        }

        self.file.decls.push(DeclIr::Interface(out));
    }

    fn lower_signature(&mut self, member: &TSSignature<'_>, out: &mut InterfaceIr) {
        match member {
            TSSignature::TSPropertySignature(p) => {
                let Some(name) = property_key_name(&p.key) else { return };
                out.props.push(PropIr {
                    name,
                    ann: p
                        .type_annotation
                        .as_ref()
                        .map(|ann| self.lower_ann(&ann.type_annotation)),
                    optional: p.optional,
                    readonly: p.readonly,
                    is_static: false,
                    accessibility: None,
                    doc: self.doc(p.span.start),
                });
            }
            TSSignature::TSMethodSignature(m) => {
                let Some(name) = property_key_name(&m.key) else { return };
                let kind = match m.kind {
                    TSMethodSignatureKind::Get => MethodKind::Getter,
                    TSMethodSignatureKind::Set => MethodKind::Setter,
                    _ => MethodKind::Method,
                };
                out.methods.push(MethodIr {
                    name,
                    kind,
                    type_params: self.lower_type_params(m.type_parameters.as_deref()),
                    params: self.lower_params(&m.params),
                    ret: m
                        .return_type
                        .as_ref()
                        .map(|ret| self.lower_ann(&ret.type_annotation)),
                    doc: self.doc(m.span.start),
                    is_static: false,
                    is_async: false,
                    optional: m.optional,
                    accessibility: None,
                    has_body: false,
                });
            }
            TSSignature::TSIndexSignature(sig) => {
                if let Some(index) = self.lower_index_signature(sig) {
                    out.index_sigs.push(index);
                }
            }
            _ => {}
        }
    }

    fn lower_index_signature(&mut self, sig: &TSIndexSignature<'_>) -> Option<IndexSigIr> {
        let param = sig.parameters.first()?;
        Some(IndexSigIr {
            key_name: param.name.to_string(),
            key_type: self
                .slice(param.type_annotation.type_annotation.span())
                .to_string(),
            value: self.lower_ann(&sig.type_annotation.type_annotation),
            readonly: sig.readonly,
        })
    }

    fn lower_enum(&mut self, decl: &TSEnumDeclaration<'_>, exported: bool) {
        let mut members = Vec::new();
        for member in &decl.body.members {
            match &member.id {
                TSEnumMemberName::Identifier(id) => members.push(id.name.to_string()),
                TSEnumMemberName::String(s) => members.push(s.value.to_string()),
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }

        self.file.decls.push(DeclIr::Enum(EnumIr {
            common: DeclCommon {
                name: decl.id.name.to_string(),
                exported,
                doc: self.doc(decl.span.start),
                type_params: Vec::new(),
            },
            members,
        }));
    }

    fn lower_alias(&mut self, decl: &TSTypeAliasDeclaration<'_>, exported: bool) {
        self.file.decls.push(DeclIr::Alias(AliasIr {
            common: DeclCommon {
                name: decl.id.name.to_string(),
                exported,
                doc: self.doc(decl.span.start),
                type_params: self.lower_type_params(decl.type_parameters.as_deref()),
            },
            ann: self.lower_ann(&decl.type_annotation),
        }));
    }

    fn lower_function(&mut self, func: &Function<'_>, exported: bool) {
        let Some(id) = &func.id else { return };
        self.file.decls.push(DeclIr::Function(FunctionIr {
            common: DeclCommon {
                name: id.name.to_string(),
                exported,
                doc: self.doc(func.span.start),
                type_params: self.lower_type_params(func.type_parameters.as_deref()),
            },
            params: self.lower_params(&func.params),
            ret: func
                .return_type
                .as_ref()
                .map(|ret| self.lower_ann(&ret.type_annotation)),
            is_async: func.r#async,
            has_body: func.body.is_some(),
        }));
    }

    /// Exported `const f = (...) => ...` and function expressions surface as
    /// functions; other variables are not part of the API model.
    fn lower_variable(&mut self, decl: &VariableDeclaration<'_>, exported: bool) {
        if !exported {
            return;
        }
        for declarator in &decl.declarations {
            let BindingPatternKind::BindingIdentifier(id) = &declarator.id.kind else {
                continue;
            };
            let doc = self.doc(decl.span.start);
            match &declarator.init {
                Some(Expression::ArrowFunctionExpression(arrow)) => {
                    self.file.decls.push(DeclIr::Function(FunctionIr {
                        common: DeclCommon {
                            name: id.name.to_string(),
                            exported,
                            doc,
                            type_params: Vec::new(),
                        },
                        params: self.lower_params(&arrow.params),
                        ret: arrow
                            .return_type
                            .as_ref()
                            .map(|ret| self.lower_ann(&ret.type_annotation)),
                        is_async: arrow.r#async,
                        has_body: true,
                    }));
                }
                Some(Expression::FunctionExpression(func)) => {
                    self.file.decls.push(DeclIr::Function(FunctionIr {
                        common: DeclCommon {
                            name: id.name.to_string(),
                            exported,
                            doc,
                            type_params: self.lower_type_params(func.type_parameters.as_deref()),
                        },
                        params: self.lower_params(&func.params),
                        ret: func
                            .return_type
                            .as_ref()
                            .map(|ret| self.lower_ann(&ret.type_annotation)),
                        is_async: func.r#async,
                        has_body: true,
                    }));
                }
                _ => {}
            }
        }
    }

    fn lower_type_params(&self, params: Option<&TSTypeParameterDeclaration<'_>>) -> Vec<String> {
        params
            .map(|p| {
                p.params
                    .iter()
                    .map(|tp| self.slice(tp.span).to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lower_params(&self, params: &FormalParameters<'_>) -> Vec<ParamIr> {
        let mut out = Vec::new();
        for param in &params.items {
            out.push(self.lower_binding_param(&param.pattern, false));
        }
        if let Some(rest) = &params.rest {
            out.push(self.lower_binding_param(&rest.argument, true));
        }
        out
    }

    fn lower_binding_param(&self, pattern: &BindingPattern<'_>, rest: bool) -> ParamIr {
        let (name, default) = match &pattern.kind {
            BindingPatternKind::BindingIdentifier(id) => (id.name.to_string(), None),
            BindingPatternKind::AssignmentPattern(assign) => {
                let name = match &assign.left.kind {
                    BindingPatternKind::BindingIdentifier(id) => id.name.to_string(),
                    other => self.slice(other.span()).to_string(),
                };
                (name, Some(self.slice(assign.right.span()).to_string()))
            }
            other => (self.slice(other.span()).to_string(), None),
        };

        ParamIr {
            name,
            ann: pattern
                .type_annotation
                .as_ref()
                .map(|ann| self.lower_ann(&ann.type_annotation)),
            optional: pattern.optional,
            rest,
            default,
        }
    }

    fn lower_ann(&self, ty: &TSType<'_>) -> TypeAnn {
        TypeAnn {
            text: self.slice(ty.span()).to_string(),
            expr: self.lower_type(ty),
        }
    }

    fn lower_type(&self, ty: &TSType<'_>) -> TypeExpr {
        match ty {
            TSType::TSStringKeyword(_) => TypeExpr::Keyword("string".to_string()),
            TSType::TSNumberKeyword(_) => TypeExpr::Keyword("number".to_string()),
            TSType::TSBooleanKeyword(_) => TypeExpr::Keyword("boolean".to_string()),
            TSType::TSBigIntKeyword(_) => TypeExpr::Keyword("bigint".to_string()),
            TSType::TSSymbolKeyword(_) => TypeExpr::Keyword("symbol".to_string()),
            TSType::TSObjectKeyword(_) => TypeExpr::Keyword("object".to_string()),
            TSType::TSAnyKeyword(_) => TypeExpr::Keyword("any".to_string()),
            TSType::TSUnknownKeyword(_) => TypeExpr::Keyword("unknown".to_string()),
            TSType::TSNeverKeyword(_) => TypeExpr::Keyword("never".to_string()),
            TSType::TSVoidKeyword(_) => TypeExpr::Keyword("void".to_string()),
            TSType::TSUndefinedKeyword(_) => TypeExpr::Keyword("undefined".to_string()),
            TSType::TSNullKeyword(_) => TypeExpr::Keyword("null".to_string()),
            TSType::TSThisType(_) => TypeExpr::Keyword("this".to_string()),
            TSType::TSIntrinsicKeyword(_) => TypeExpr::Keyword("intrinsic".to_string()),

            TSType::TSTypeReference(reference) => TypeExpr::Named {
                name: ts_type_name_text(&reference.type_name),
                args: reference
                    .type_arguments
                    .as_ref()
                    .map(|ta| ta.params.iter().map(|t| self.lower_type(t)).collect())
                    .unwrap_or_default(),
            },

            TSType::TSUnionType(union) => {
                TypeExpr::Union(union.types.iter().map(|t| self.lower_type(t)).collect())
            }
            TSType::TSIntersectionType(inter) => TypeExpr::Intersection(
                inter.types.iter().map(|t| self.lower_type(t)).collect(),
            ),
            TSType::TSArrayType(array) => {
                TypeExpr::Array(Box::new(self.lower_type(&array.element_type)))
            }
            TSType::TSTupleType(tuple) => TypeExpr::Tuple(
                tuple
                    .element_types
                    .iter()
                    .map(|e| self.lower_tuple_element(e))
                    .collect(),
            ),

            TSType::TSFunctionType(func) => TypeExpr::Function(Box::new(FunctionShape {
                params: self.lower_params(&func.params),
                ret: Some(self.lower_ann(&func.return_type.type_annotation)),
            })),
            TSType::TSConstructorType(ctor) => TypeExpr::Function(Box::new(FunctionShape {
                params: self.lower_params(&ctor.params),
                ret: Some(self.lower_ann(&ctor.return_type.type_annotation)),
            })),

            TSType::TSTypeLiteral(literal) => TypeExpr::Object(self.lower_type_literal(literal)),

            TSType::TSTypeQuery(query) => {
                TypeExpr::Typeof(self.slice(query.expr_name.span()).to_string())
            }
            TSType::TSLiteralType(literal) => {
                TypeExpr::Literal(self.slice(literal.span).to_string())
            }
            TSType::TSParenthesizedType(paren) => self.lower_type(&paren.type_annotation),
            TSType::TSTypeOperatorType(op) => TypeExpr::Other {
                children: vec![self.lower_type(&op.type_annotation)],
            },
            TSType::TSIndexedAccessType(indexed) => TypeExpr::Other {
                children: vec![
                    self.lower_type(&indexed.object_type),
                    self.lower_type(&indexed.index_type),
                ],
            },
            TSType::TSConditionalType(cond) => TypeExpr::Other {
                children: vec![
                    self.lower_type(&cond.check_type),
                    self.lower_type(&cond.extends_type),
                    self.lower_type(&cond.true_type),
                    self.lower_type(&cond.false_type),
                ],
            },
            TSType::TSTemplateLiteralType(template) => TypeExpr::Other {
                children: template.types.iter().map(|t| self.lower_type(t)).collect(),
            },
            TSType::TSNamedTupleMember(named) => self.lower_tuple_element(&named.element_type),

            _ => TypeExpr::opaque(),
        }
    }

    fn lower_tuple_element(&self, element: &TSTupleElement<'_>) -> TypeExpr {
        match element {
            TSTupleElement::TSOptionalType(opt) => self.lower_type(&opt.type_annotation),
            TSTupleElement::TSRestType(rest) => self.lower_type(&rest.type_annotation),
            match_ts_type!(TSTupleElement) => self.lower_type(element.to_ts_type()),
        }
    }

    fn lower_type_literal(&self, literal: &TSTypeLiteral<'_>) -> ObjectShape {
        let mut shape = ObjectShape::default();
        for member in &literal.members {
            match member {
                TSSignature::TSPropertySignature(prop) => {
                    let Some(name) = property_key_name(&prop.key) else { continue };
                    shape.props.push(ObjectProp {
                        name,
                        ann: prop
                            .type_annotation
                            .as_ref()
                            .map(|ann| self.lower_ann(&ann.type_annotation)),
                        optional: prop.optional,
                    });
                }
                TSSignature::TSCallSignatureDeclaration(call) => {
                    shape.calls.push(FunctionShape {
                        params: self.lower_params(&call.params),
                        ret: call
                            .return_type
                            .as_ref()
                            .map(|ret| self.lower_ann(&ret.type_annotation)),
                    });
                }
                TSSignature::TSMethodSignature(method) => {
                    shape.calls.push(FunctionShape {
                        params: self.lower_params(&method.params),
                        ret: method
                            .return_type
                            .as_ref()
                            .map(|ret| self.lower_ann(&ret.type_annotation)),
                    });
                }
                TSSignature::TSIndexSignature(sig) => {
                    shape
                        .index_values
                        .push(self.lower_ann(&sig.type_annotation.type_annotation));
                }
                _ => {}
            }
        }
        shape
    }
}

/// Exported/imported name from a `ModuleExportName`.
fn module_export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

/// Dotted text of a `TSTypeName` (`Foo`, `ns.Foo`).
fn ts_type_name_text(name: &TSTypeName<'_>) -> String {
    match name {
        TSTypeName::IdentifierReference(id) => id.name.to_string(),
        TSTypeName::QualifiedName(q) => {
            format!("{}.{}", ts_type_name_text(&q.left), q.right.name)
        }
        _ => "this".to_string(),
    }
}

/// Non-computed, non-private property key name.
fn property_key_name(key: &PropertyKey<'_>) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
        PropertyKey::PrivateIdentifier(_) => None,
        _ => None,
    }
}

fn accessibility_of(value: Option<TSAccessibility>) -> Option<Accessibility> {
    value.map(|a| match a {
        TSAccessibility::Private => Accessibility::Private,
        TSAccessibility::Protected => Accessibility::Protected,
        TSAccessibility::Public => Accessibility::Public,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn lower(src: &str) -> FileIr {
        lower_source(src, Path::new("src/index.ts"), "index".to_string()).unwrap()
    }

    #[test]
    fn test_lower_exported_class() {
        let file = lower(
            r#"
/** A widget client. */
export declare class Widget extends Base implements Disposable {
    /** Creates a widget. */
    constructor(name: string);
    readonly name: string;
    private secret: string;
    render(depth?: number): Frame;
    static create(): Widget;
}
"#,
        );
        let DeclIr::Class(class) = file.decl("Widget").unwrap() else {
            panic!("expected class");
        };
        assert!(class.common.exported);
        assert_eq!(class.common.doc.summary.as_deref(), Some("A widget client."));
        assert_eq!(class.extends.as_ref().unwrap().name, "Base");
        assert_eq!(class.implements[0].name, "Disposable");
        assert_eq!(class.ctors.len(), 1);
        assert_eq!(class.methods.len(), 2);
        assert!(class.methods.iter().any(|m| m.name == "create" && m.is_static));
        assert_eq!(class.props.len(), 2);
        let secret = class.props.iter().find(|p| p.name == "secret").unwrap();
        assert_eq!(secret.accessibility, Some(Accessibility::Private));
    }

    #[test]
    fn test_lower_interface_members() {
        let file = lower(
            r#"
export interface Bag<T> {
    [key: string]: T;
    size: number;
    get(name: string): T | undefined;
}
"#,
        );
        let DeclIr::Interface(iface) = file.decl("Bag").unwrap() else {
            panic!("expected interface");
        };
        assert_eq!(iface.common.type_params, vec!["T".to_string()]);
        assert_eq!(iface.index_sigs.len(), 1);
        assert_eq!(iface.index_sigs[0].key_name, "key");
        assert_eq!(iface.index_sigs[0].key_type, "string");
        assert_eq!(iface.props.len(), 1);
        assert_eq!(iface.methods.len(), 1);
        let get = &iface.methods[0];
        assert_eq!(get.ret.as_ref().unwrap().text, "T | undefined");
    }

    #[test]
    fn test_lower_imports_and_reexports() {
        let file = lower(
            r#"
import { PipelineRequest, PipelineResponse as Res } from "@core/pipeline";
import Client from "client-lib";
import * as util from "./util";
export { Helper } from "./helper";
export * from "./models";
"#,
        );
        assert_eq!(file.imports.len(), 3);
        let pipeline = &file.imports[0];
        assert!(pipeline.is_bare());
        assert_eq!(
            pipeline.named,
            vec![
                ("PipelineRequest".to_string(), "PipelineRequest".to_string()),
                ("PipelineResponse".to_string(), "Res".to_string()),
            ]
        );
        assert_eq!(file.imports[1].default_local.as_deref(), Some("Client"));
        assert_eq!(file.imports[2].namespace_local.as_deref(), Some("util"));

        assert_eq!(file.reexports.len(), 2);
        assert!(!file.reexports[0].is_star);
        assert!(file.reexports[1].is_star);
    }

    #[test]
    fn test_lower_alias_and_enum() {
        let file = lower(
            r#"
export type OperationRequest = PipelineRequest;
export enum Color { Red, Green, Blue }
"#,
        );
        let DeclIr::Alias(alias) = file.decl("OperationRequest").unwrap() else {
            panic!("expected alias");
        };
        assert_eq!(alias.ann.text, "PipelineRequest");
        assert!(matches!(&alias.ann.expr, TypeExpr::Named { name, .. } if name == "PipelineRequest"));

        let DeclIr::Enum(en) = file.decl("Color").unwrap() else {
            panic!("expected enum");
        };
        assert_eq!(en.members, vec!["Red", "Green", "Blue"]);
    }

    #[test]
    fn test_deprecated_and_internal_tags() {
        let file = lower(
            r#"
/**
 * Old entry.
 * @deprecated use sendRequest instead
 */
export declare function legacySend(): void;

/** @internal */
export declare function hidden(): void;
"#,
        );
        let legacy = file.decl("legacySend").unwrap().common();
        assert!(legacy.doc.deprecated);
        assert_eq!(
            legacy.doc.deprecation_message.as_deref(),
            Some("use sendRequest instead")
        );
        assert!(file.decl("hidden").unwrap().common().doc.internal);
    }

    #[test]
    fn test_anonymous_object_type_lowering() {
        let file = lower("export type Opts = { cb?: (x: Foo) => Bar };");
        let DeclIr::Alias(alias) = file.decl("Opts").unwrap() else {
            panic!("expected alias");
        };
        let TypeExpr::Object(shape) = &alias.ann.expr else {
            panic!("expected object shape");
        };
        assert_eq!(shape.props.len(), 1);
        let cb = &shape.props[0];
        assert!(cb.optional);
        let TypeExpr::Function(func) = &cb.ann.as_ref().unwrap().expr else {
            panic!("expected function type");
        };
        assert_eq!(func.params[0].ann.as_ref().unwrap().text, "Foo");
        assert_eq!(func.ret.as_ref().unwrap().text, "Bar");
    }

    #[test]
    fn test_exported_arrow_function() {
        let file = lower("export const makeClient = (name: string): Client => new Client(name);");
        let DeclIr::Function(func) = file.decl("makeClient").unwrap() else {
            panic!("expected function");
        };
        assert_eq!(func.ret.as_ref().unwrap().text, "Client");
    }

    #[test]
    fn test_export_list_marks_decls() {
        let file = lower("class Hidden {}\nexport { Hidden as Visible };");
        let decl = file.decl("Hidden").unwrap();
        assert!(decl.common().exported);
        assert!(file.exports_name("Visible"));
    }
}
