//! Core data types for the Sable API graph.
//!
//! Everything that ends up in the emitted JSON lives here. Field names are
//! serialized in camelCase to keep the document language-independent;
//! optional fields and empty collections are omitted on serialize.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cancel::CancellationToken;
use crate::diag::ApiDiagnostic;

/// The normalized API graph of one extracted package.
///
/// Exactly one `ApiIndex` is produced per extraction run. It is mutated only
/// during graph assembly (ID assignment, entry-point tagging, reachability
/// filtering) and immutable thereafter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiIndex {
    /// Package name from the manifest.
    pub package: String,

    /// Package version from the manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Modules keyed by relative path, sorted by name.
    pub modules: Vec<ModuleInfo>,

    /// External packages referenced by the reachable surface.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencyInfo>>,

    /// Non-fatal findings from the run, stable across reruns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ApiDiagnostic>,

    /// Cross-language identifier of the whole package, when a map was joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_package_id: Option<String>,
}

/// One module (file) of the extracted package.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    /// Relative path of the module without extension (e.g. `esm/index`).
    pub name: String,

    /// Most-general export condition under which this module is reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Ordered condition keys crossed to reach this module's export entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_chain: Option<Vec<String>>,

    /// Export subpath (`.` for the root export).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<InterfaceInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enums: Option<Vec<EnumInfo>>,

    /// Type aliases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<TypeAliasInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionInfo>>,
}

impl ModuleInfo {
    /// True when every entity list is absent or empty.
    pub fn is_empty(&self) -> bool {
        fn none_or_empty<T>(v: &Option<Vec<T>>) -> bool {
            v.as_ref().map_or(true, |v| v.is_empty())
        }
        none_or_empty(&self.classes)
            && none_or_empty(&self.interfaces)
            && none_or_empty(&self.enums)
            && none_or_empty(&self.types)
            && none_or_empty(&self.functions)
    }
}

/// An exported class.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub name: String,

    /// Deterministic identifier, assigned during graph assembly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_id: Option<String>,

    /// Set when the class is reachable directly through the export map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,

    /// External package this symbol is re-exported from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_exported_from: Option<String>,

    /// Base class, as written at the declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub implements: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_params: Option<Vec<String>>,

    /// First line of the doc comment, truncated to 120 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructors: Option<Vec<ConstructorInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<MethodInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PropertyInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_signatures: Option<Vec<IndexSignatureInfo>>,

    /// Names of in-index types this entity references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_types: Option<Vec<String>>,
}

/// An exported interface. Shaped like [`ClassInfo`] minus constructors and
/// statics; `extends` is a list because interfaces support multiple bases.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_exported_from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_params: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<MethodInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PropertyInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_signatures: Option<Vec<IndexSignatureInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_types: Option<Vec<String>>,
}

/// An exported enum. Member names only; values are not part of the surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnumInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_exported_from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    /// Ordered member names.
    pub values: Vec<String>,
}

/// An exported type alias. `ty` is the rendered body text; the sentinel
/// `"unresolved"` marks a dependency type that could not be extracted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeAliasInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_exported_from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_params: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    /// Rendered alias body.
    #[serde(rename = "type")]
    pub ty: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_types: Option<Vec<String>>,
}

/// The sentinel body used for dependency types that could not be resolved.
pub const UNRESOLVED_TYPE: &str = "unresolved";

impl TypeAliasInfo {
    /// An unresolved-dependency placeholder for `name`.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: UNRESOLVED_TYPE.to_string(),
            ..Default::default()
        }
    }

    /// True when this alias is the unresolved-dependency sentinel.
    pub fn is_unresolved(&self) -> bool {
        self.ty == UNRESOLVED_TYPE
    }
}

/// An exported module-level function.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_exported_from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_params: Option<Vec<String>>,

    /// Parenthesized rendered parameter list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<ParameterInfo>>,

    /// Rendered return type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ret: Option<String>,

    #[serde(rename = "async", skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_types: Option<Vec<String>>,
}

/// A class or interface method.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MethodInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_params: Option<Vec<String>>,

    /// Parenthesized rendered parameter list.
    pub sig: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<ParameterInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ret: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,

    #[serde(rename = "async", skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,

    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
}

/// A class constructor overload. Constructors carry no name; the member ID
/// uses the fixed segment `constructor`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_id: Option<String>,

    pub sig: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<ParameterInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
}

/// A class or interface property.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_language_id: Option<String>,

    /// Rendered declared type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,

    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
}

/// One formal parameter of a function, method, or constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInfo {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest: Option<bool>,
}

/// An index signature (`[key: string]: Value`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexSignatureInfo {
    pub key_name: String,

    pub key_type: String,

    pub value_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
}

/// Types extracted from one external package referenced by the surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyInfo {
    /// Package name; never the current package's own name.
    pub package: String,

    /// Set for runtime-stdlib ambient types (`Buffer` and friends).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_node: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<InterfaceInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enums: Option<Vec<EnumInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<TypeAliasInfo>>,
}

/// Cross-language ID map supplied by the caller and joined during assembly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrossLanguageMap {
    /// Cross-language identifier of the package itself.
    pub package_id: String,

    /// Local deterministic id -> cross-language id.
    #[serde(default)]
    pub ids: BTreeMap<String, String>,
}

/// One `(type, operation)` pair from usage analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct OperationRef {
    /// Client type name.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Method name on that client.
    pub operation: String,
}

impl OperationRef {
    pub fn new(type_name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            operation: operation.into(),
        }
    }
}

/// Result of analyzing a samples directory against an [`ApiIndex`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageIndex {
    /// Number of sample files scanned.
    pub file_count: usize,

    /// Operations exercised by the samples, sorted by type then operation.
    pub covered_operations: Vec<OperationRef>,

    /// Operations declared by the API but never exercised.
    pub uncovered_operations: Vec<OperationRef>,

    /// Structural patterns observed (`async`, `error-handling`, `streaming`).
    pub patterns: Vec<String>,
}

/// Coverage summary combining an [`ApiIndex`] with a [`UsageIndex`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Operations counted toward coverage (deprecated-uncovered excluded).
    pub total: usize,

    pub covered: usize,

    /// `covered / total * 100`, zero when `total` is zero.
    pub percentage: f64,

    pub covered_operations: Vec<OperationRef>,

    pub uncovered_operations: Vec<OperationRef>,

    /// Deprecated operations the samples never touched; intentionally not
    /// counted against coverage.
    pub deprecated_excluded: Vec<OperationRef>,
}

/// Extraction mode: parse sources or published declaration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Load `.ts/.tsx/.mts` sources.
    Source,
    /// Load `.d.ts/.d.mts/.d.cts` declarations from a declarations root.
    Compiled,
}

impl Default for ExtractMode {
    fn default() -> Self {
        ExtractMode::Source
    }
}

/// Options for one extraction run. These are the only knobs.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Package root directory.
    pub root: PathBuf,

    /// Source vs compiled loading.
    pub mode: ExtractMode,

    /// Declarations root for compiled mode.
    pub declarations_root: Option<PathBuf>,

    /// Explicit manifest path; defaults to `<root>/package.json`.
    pub manifest_path: Option<PathBuf>,

    /// Optional cross-language ID map joined during assembly.
    pub cross_language_map: Option<CrossLanguageMap>,

    /// Cooperative cancellation signal.
    pub cancel: CancellationToken,
}
