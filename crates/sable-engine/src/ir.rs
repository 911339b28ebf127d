//! Owned declaration IR.
//!
//! The oxc AST borrows from a per-parse arena, so each file is lowered into
//! this owned form immediately after parsing and the arena is dropped. The IR
//! keeps two views of every type annotation: a structured [`TypeExpr`] tree
//! for reference collection, and the verbatim source text for display.

use std::path::PathBuf;

/// A type annotation: structure plus the exact source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnn {
    /// Verbatim annotation text from the source file.
    pub text: String,
    pub expr: TypeExpr,
}

impl TypeAnn {
    pub fn new(text: impl Into<String>, expr: TypeExpr) -> Self {
        Self {
            text: text.into(),
            expr,
        }
    }
}

/// Structured type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Intrinsic keyword type (`string`, `void`, `any`, ...).
    Keyword(String),

    /// A named reference, possibly qualified (`Foo`, `ns.Bar`), with its
    /// generic arguments.
    Named { name: String, args: Vec<TypeExpr> },

    Union(Vec<TypeExpr>),

    Intersection(Vec<TypeExpr>),

    Array(Box<TypeExpr>),

    Tuple(Vec<TypeExpr>),

    /// A function or constructor type.
    Function(Box<FunctionShape>),

    /// An anonymous object literal type.
    Object(ObjectShape),

    /// `typeof expr`.
    Typeof(String),

    /// A literal type (`"a"`, `1`, `true`).
    Literal(String),

    /// Anything else (conditional, mapped, indexed-access, import types...).
    /// `children` preserves nested types so reference collection still
    /// descends into them.
    Other { children: Vec<TypeExpr> },
}

impl TypeExpr {
    /// Opaque node with no traversable children.
    pub fn opaque() -> Self {
        TypeExpr::Other {
            children: Vec::new(),
        }
    }
}

/// Callable shape shared by function types, call signatures, and overloads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionShape {
    pub params: Vec<ParamIr>,
    pub ret: Option<TypeAnn>,
}

/// Anonymous object literal: the collector descends into call signatures,
/// property types, and index value types.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectShape {
    pub calls: Vec<FunctionShape>,
    pub props: Vec<ObjectProp>,
    pub index_values: Vec<TypeAnn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProp {
    pub name: String,
    pub ann: Option<TypeAnn>,
    pub optional: bool,
}

/// One formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamIr {
    pub name: String,
    pub ann: Option<TypeAnn>,
    pub optional: bool,
    pub rest: bool,
    /// Default value text, when the parameter has an initializer.
    pub default: Option<String>,
}

/// Doc-comment facts attached to a declaration or member.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocIr {
    /// First line of the doc comment, untruncated.
    pub summary: Option<String>,
    pub deprecated: bool,
    pub deprecation_message: Option<String>,
    /// Tagged `@internal` or `@hidden`.
    pub internal: bool,
}

/// Member accessibility. Absent means public.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessibility {
    Public,
    Protected,
    Private,
}

/// A base-type reference in an `extends` / `implements` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct HeritageRef {
    /// Base name as written, without type arguments (`Base`, `ns.Base`).
    pub name: String,
    /// Generic arguments applied to the base.
    pub args: Vec<TypeExpr>,
}

/// Fields shared by all top-level declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclCommon {
    pub name: String,
    /// Directly exported at the declaration site.
    pub exported: bool,
    pub doc: DocIr,
    /// Rendered type parameters (`T`, `K extends string`).
    pub type_params: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

/// A class or interface method (or accessor).
#[derive(Debug, Clone, PartialEq)]
pub struct MethodIr {
    pub name: String,
    pub kind: MethodKind,
    pub type_params: Vec<String>,
    pub params: Vec<ParamIr>,
    pub ret: Option<TypeAnn>,
    pub doc: DocIr,
    pub is_static: bool,
    pub is_async: bool,
    pub optional: bool,
    pub accessibility: Option<Accessibility>,
    /// The declaration carries an implementation body (overload impls are
    /// skipped when overload signatures exist).
    pub has_body: bool,
}

/// A class or interface property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropIr {
    pub name: String,
    pub ann: Option<TypeAnn>,
    pub optional: bool,
    pub readonly: bool,
    pub is_static: bool,
    pub accessibility: Option<Accessibility>,
    pub doc: DocIr,
}

/// A constructor overload.
#[derive(Debug, Clone, PartialEq)]
pub struct CtorIr {
    pub params: Vec<ParamIr>,
    pub doc: DocIr,
    pub accessibility: Option<Accessibility>,
    pub has_body: bool,
}

/// An index signature.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSigIr {
    pub key_name: String,
    pub key_type: String,
    pub value: TypeAnn,
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassIr {
    pub common: DeclCommon,
    pub extends: Option<HeritageRef>,
    pub implements: Vec<HeritageRef>,
    pub ctors: Vec<CtorIr>,
    pub methods: Vec<MethodIr>,
    pub props: Vec<PropIr>,
    pub index_sigs: Vec<IndexSigIr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceIr {
    pub common: DeclCommon,
    pub extends: Vec<HeritageRef>,
    pub methods: Vec<MethodIr>,
    pub props: Vec<PropIr>,
    pub index_sigs: Vec<IndexSigIr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumIr {
    pub common: DeclCommon,
    /// Ordered member names.
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasIr {
    pub common: DeclCommon,
    pub ann: TypeAnn,
}

/// One function declaration (overloads are separate `FunctionIr`s grouped by
/// name at extraction time).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionIr {
    pub common: DeclCommon,
    pub params: Vec<ParamIr>,
    pub ret: Option<TypeAnn>,
    pub is_async: bool,
    pub has_body: bool,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclIr {
    Class(ClassIr),
    Interface(InterfaceIr),
    Enum(EnumIr),
    Alias(AliasIr),
    Function(FunctionIr),
}

impl DeclIr {
    pub fn common(&self) -> &DeclCommon {
        match self {
            DeclIr::Class(d) => &d.common,
            DeclIr::Interface(d) => &d.common,
            DeclIr::Enum(d) => &d.common,
            DeclIr::Alias(d) => &d.common,
            DeclIr::Function(d) => &d.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut DeclCommon {
        match self {
            DeclIr::Class(d) => &mut d.common,
            DeclIr::Interface(d) => &mut d.common,
            DeclIr::Enum(d) => &mut d.common,
            DeclIr::Alias(d) => &mut d.common,
            DeclIr::Function(d) => &mut d.common,
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }
}

/// One import declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportIr {
    /// Import specifier as written (`react`, `./util`).
    pub source: String,
    pub default_local: Option<String>,
    /// `(imported, local)` pairs.
    pub named: Vec<(String, String)>,
    /// Local name of `import * as X`.
    pub namespace_local: Option<String>,
    pub type_only: bool,
}

impl ImportIr {
    /// Bare specifier (external package) rather than a relative path.
    pub fn is_bare(&self) -> bool {
        !self.source.starts_with('.') && !self.source.starts_with('/')
    }
}

/// One re-export (`export { A } from 's'`, `export * from 's'`).
#[derive(Debug, Clone, PartialEq)]
pub struct ReexportIr {
    pub source: String,
    /// `(local-in-source, exported)` pairs; empty for star re-exports.
    pub names: Vec<(String, String)>,
    pub is_star: bool,
}

impl ReexportIr {
    pub fn is_bare(&self) -> bool {
        !self.source.starts_with('.') && !self.source.starts_with('/')
    }
}

/// Lowered form of one source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileIr {
    pub path: PathBuf,
    /// Relative path without extension, used as the module name.
    pub module_name: String,
    pub decls: Vec<DeclIr>,
    pub imports: Vec<ImportIr>,
    pub reexports: Vec<ReexportIr>,
    /// `(local, exported)` pairs from `export { A as B }` without a source.
    pub export_aliases: Vec<(String, String)>,
}

impl FileIr {
    /// Find a declaration by name.
    pub fn decl(&self, name: &str) -> Option<&DeclIr> {
        self.decls.iter().find(|d| d.name() == name)
    }

    /// True when `name` is exported from this file, directly or through an
    /// `export { ... }` list.
    pub fn exports_name(&self, name: &str) -> bool {
        self.decls
            .iter()
            .any(|d| d.name() == name && d.common().exported)
            || self.export_aliases.iter().any(|(_, e)| e == name)
    }

    /// Declared names this file exports (declaration-site exports plus
    /// export lists, not re-exports). Names are the declaration names, which
    /// is how entities are keyed everywhere downstream.
    pub fn exported_local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for decl in &self.decls {
            if decl.common().exported && !names.iter().any(|n| n == decl.name()) {
                names.push(decl.name().to_string());
            }
        }
        names
    }
}
