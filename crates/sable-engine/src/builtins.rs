//! Language-intrinsic type classification.
//!
//! A builtin is a type declared by the language's own standard library; those
//! never become dependency edges. Runtime-stdlib types (`Buffer`, `NodeJS.*`)
//! are deliberately *not* builtins — they surface as a `node` dependency.

use rustc_hash::FxHashSet;

/// Primitive / keyword type names.
pub const PRIMITIVES: &[&str] = &[
    "string",
    "number",
    "boolean",
    "symbol",
    "bigint",
    "undefined",
    "null",
    "void",
    "never",
    "any",
    "unknown",
    "object",
];

/// Names declared by the bundled TypeScript lib files. Used as the seed when
/// no lib declarations are available to scan.
const DEFAULT_LIB_TYPES: &[&str] = &[
    "Array",
    "ReadonlyArray",
    "ArrayLike",
    "ConcatArray",
    "Promise",
    "PromiseLike",
    "Awaited",
    "Map",
    "ReadonlyMap",
    "WeakMap",
    "Set",
    "ReadonlySet",
    "WeakSet",
    "Record",
    "Partial",
    "Required",
    "Readonly",
    "Pick",
    "Omit",
    "Exclude",
    "Extract",
    "NonNullable",
    "Parameters",
    "ReturnType",
    "ConstructorParameters",
    "InstanceType",
    "ThisType",
    "ThisParameterType",
    "OmitThisParameter",
    "Uppercase",
    "Lowercase",
    "Capitalize",
    "Uncapitalize",
    "Iterable",
    "Iterator",
    "IterableIterator",
    "IteratorResult",
    "AsyncIterable",
    "AsyncIterator",
    "AsyncIterableIterator",
    "Generator",
    "AsyncGenerator",
    "Date",
    "RegExp",
    "RegExpMatchArray",
    "RegExpExecArray",
    "Error",
    "EvalError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "URIError",
    "AggregateError",
    "Function",
    "CallableFunction",
    "NewableFunction",
    "Object",
    "String",
    "Number",
    "Boolean",
    "Symbol",
    "BigInt",
    "JSON",
    "Math",
    "PropertyKey",
    "PropertyDescriptor",
    "TemplateStringsArray",
    "ArrayBuffer",
    "ArrayBufferLike",
    "SharedArrayBuffer",
    "DataView",
    "Int8Array",
    "Uint8Array",
    "Uint8ClampedArray",
    "Int16Array",
    "Uint16Array",
    "Int32Array",
    "Uint32Array",
    "Float32Array",
    "Float64Array",
    "BigInt64Array",
    "BigUint64Array",
    "Atomics",
    "Proxy",
    "ProxyHandler",
    "Reflect",
    "Disposable",
    "AsyncDisposable",
    "DisposableStack",
    "AsyncDisposableStack",
    "FinalizationRegistry",
    "WeakRef",
    "Intl",
];

/// Node runtime built-in module names. Imports of these are skipped by the
/// dependency resolver; their types never appear as dependency types.
pub const NODE_BUILTIN_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Ambient global type names contributed by the node runtime. References to
/// these resolve to the pseudo-package `node` with `isNode` set.
pub const NODE_AMBIENT_TYPES: &[&str] = &["Buffer", "NodeJS", "NodeRequire", "NodeModule"];

/// True when `specifier` names a node runtime module (`fs`, `node:fs`, ...).
pub fn is_node_module(specifier: &str) -> bool {
    let bare = specifier.strip_prefix("node:").unwrap_or(specifier);
    NODE_BUILTIN_MODULES.contains(&bare)
}

/// Classifier over primitive names plus types discovered in intrinsic lib
/// declaration files.
#[derive(Debug)]
pub struct BuiltinClassifier {
    discovered: FxHashSet<String>,
}

impl BuiltinClassifier {
    /// Seed the classifier with the default lib tables.
    pub fn new() -> Self {
        Self {
            discovered: DEFAULT_LIB_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether `file_name` is an intrinsic lib declaration file
    /// (`lib.es2020.d.ts`, ...). Such files are scanned, never extracted.
    pub fn is_lib_file(file_name: &str) -> bool {
        file_name.starts_with("lib.") && file_name.ends_with(".d.ts")
    }

    /// Record a type name discovered in an intrinsic lib file.
    pub fn discover(&mut self, name: impl Into<String>) {
        self.discovered.insert(name.into());
    }

    /// `name ∈ PRIMITIVES ∨ name ∈ discovered`.
    pub fn is_builtin(&self, name: &str) -> bool {
        PRIMITIVES.contains(&name) || self.discovered.contains(name)
    }

    /// Node ambient global, tracked as an external `node` dependency.
    pub fn is_node_ambient(&self, name: &str) -> bool {
        let root = name.split('.').next().unwrap_or(name);
        NODE_AMBIENT_TYPES.contains(&root)
    }
}

impl Default for BuiltinClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_are_builtin() {
        let classifier = BuiltinClassifier::new();
        for name in PRIMITIVES {
            assert!(classifier.is_builtin(name), "{name} should be builtin");
        }
    }

    #[test]
    fn test_lib_types_are_builtin() {
        let classifier = BuiltinClassifier::new();
        assert!(classifier.is_builtin("Promise"));
        assert!(classifier.is_builtin("Uint8Array"));
        assert!(classifier.is_builtin("Record"));
        assert!(!classifier.is_builtin("PipelineRequest"));
    }

    #[test]
    fn test_node_types_are_not_builtin() {
        let classifier = BuiltinClassifier::new();
        assert!(!classifier.is_builtin("Buffer"));
        assert!(classifier.is_node_ambient("Buffer"));
        assert!(classifier.is_node_ambient("NodeJS.ReadableStream"));
    }

    #[test]
    fn test_discovery() {
        let mut classifier = BuiltinClassifier::new();
        assert!(!classifier.is_builtin("DOMParser"));
        classifier.discover("DOMParser");
        assert!(classifier.is_builtin("DOMParser"));
    }

    #[test]
    fn test_node_module_detection() {
        assert!(is_node_module("fs"));
        assert!(is_node_module("node:fs"));
        assert!(is_node_module("stream/promises"));
        assert!(!is_node_module("@azure/core-http"));
        assert!(!is_node_module("./fs"));
    }

    #[test]
    fn test_lib_file_detection() {
        assert!(BuiltinClassifier::is_lib_file("lib.es2020.d.ts"));
        assert!(BuiltinClassifier::is_lib_file("lib.dom.d.ts"));
        assert!(!BuiltinClassifier::is_lib_file("index.d.ts"));
    }
}
