//! Package manifest parsing and export-map flattening.
//!
//! The manifest is read tolerantly (published packages occasionally ship
//! trailing commas or comments), then the `exports` field is flattened into
//! `(exportPath, conditionChain, condition, target)` rows.

use std::path::Path;

use sable_core::condition::{canonicalize_condition, condition_priority};
use sable_core::{Error, Result};
use serde_json::Value;

/// Fields of `package.json` the engine consumes.
#[derive(Debug, Clone, Default)]
pub struct PackageManifest {
    pub name: String,
    pub version: Option<String>,
    pub exports: Option<Value>,
    pub types: Option<String>,
    pub typings: Option<String>,
    pub module: Option<String>,
    pub main: Option<String>,
}

impl PackageManifest {
    /// Parse manifest text. Strict JSON first; the tolerant parser picks up
    /// trailing commas and comments.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(strict_err) => json_five::from_str(text).map_err(|_| Error::Json {
                file: path.to_path_buf(),
                message: strict_err.to_string(),
            })?,
        };

        let obj = value.as_object().ok_or_else(|| Error::Json {
            file: path.to_path_buf(),
            message: "manifest is not an object".to_string(),
        })?;

        let string_field =
            |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            name: string_field("name").unwrap_or_default(),
            version: string_field("version"),
            exports: obj.get("exports").cloned(),
            types: string_field("types"),
            typings: string_field("typings"),
            module: string_field("module"),
            main: string_field("main"),
        })
    }
}

/// One flattened export-map leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    /// Export subpath (`.` or `./sub`).
    pub export_path: String,
    /// Condition keys crossed to reach the leaf, in order.
    pub condition_chain: Vec<String>,
    /// Canonical condition derived from the chain.
    pub condition: String,
    /// Relative target file as written in the manifest.
    pub target: String,
}

/// Recursion bound for pathological export maps.
const MAX_EXPORTS_DEPTH: usize = 10;

/// Flatten the manifest's export surface. With no `exports` field, the legacy
/// fields each contribute a root entry under `default`.
pub fn flatten_exports(manifest: &PackageManifest) -> Vec<ExportEntry> {
    let mut entries = Vec::new();

    match &manifest.exports {
        Some(exports) => {
            walk_exports(exports, ".", &mut Vec::new(), 0, &mut entries);
        }
        None => {
            for target in [
                &manifest.types,
                &manifest.typings,
                &manifest.module,
                &manifest.main,
            ]
            .into_iter()
            .flatten()
            {
                push_entry(&mut entries, ".", &[], target);
            }
        }
    }

    sort_entries(&mut entries);
    entries
}

fn walk_exports(
    value: &Value,
    export_path: &str,
    chain: &mut Vec<String>,
    depth: usize,
    out: &mut Vec<ExportEntry>,
) {
    if depth > MAX_EXPORTS_DEPTH {
        return;
    }
    match value {
        Value::String(target) => push_entry(out, export_path, chain, target),
        Value::Array(values) => {
            // Fallback arrays: the first usable alternative wins.
            if let Some(first) = values.iter().find(|v| !v.is_null()) {
                walk_exports(first, export_path, chain, depth + 1, out);
            }
        }
        Value::Object(map) => {
            let is_subpath_map = map.keys().any(|k| k.starts_with('.'));
            if is_subpath_map {
                for (key, nested) in map {
                    if key.starts_with('.') {
                        walk_exports(nested, key, chain, depth + 1, out);
                    }
                }
            } else {
                for (key, nested) in map {
                    chain.push(key.clone());
                    walk_exports(nested, export_path, chain, depth + 1, out);
                    chain.pop();
                }
            }
        }
        _ => {}
    }
}

fn push_entry(out: &mut Vec<ExportEntry>, export_path: &str, chain: &[String], target: &str) {
    let entry = ExportEntry {
        export_path: export_path.to_string(),
        condition_chain: chain.to_vec(),
        condition: canonicalize_condition(chain),
        target: target.to_string(),
    };
    // Duplicate leaves can appear through fallback arrays; keep the first.
    if !out.iter().any(|e| {
        e.export_path == entry.export_path
            && e.condition == entry.condition
            && e.target == entry.target
    }) {
        out.push(entry);
    }
}

/// Deterministic entry order: `.` first, then by export path, then ascending
/// condition priority so the most specific declared condition claims last.
pub fn sort_entries(entries: &mut [ExportEntry]) {
    entries.sort_by(|a, b| {
        let root_a = a.export_path != ".";
        let root_b = b.export_path != ".";
        root_a
            .cmp(&root_b)
            .then_with(|| a.export_path.cmp(&b.export_path))
            .then_with(|| {
                condition_priority(&a.condition).cmp(&condition_priority(&b.condition))
            })
            .then_with(|| a.target.cmp(&b.target))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn manifest(json: &str) -> PackageManifest {
        PackageManifest::parse(json, &PathBuf::from("package.json")).unwrap()
    }

    #[test]
    fn test_parse_basic_fields() {
        let m = manifest(r#"{ "name": "@scope/pkg", "version": "1.0.0", "main": "./index.js" }"#);
        assert_eq!(m.name, "@scope/pkg");
        assert_eq!(m.version.as_deref(), Some("1.0.0"));
        assert_eq!(m.main.as_deref(), Some("./index.js"));
    }

    #[test]
    fn test_parse_tolerates_trailing_commas_and_comments() {
        let m = manifest(
            r#"{
  // package metadata
  "name": "pkg",
  "main": "./index.js",
}"#,
        );
        assert_eq!(m.name, "pkg");
        assert_eq!(m.main.as_deref(), Some("./index.js"));
    }

    #[test]
    fn test_legacy_fallback_order() {
        let m = manifest(r#"{ "name": "pkg", "typings": "./t.d.ts", "main": "./index.js" }"#);
        let entries = flatten_exports(&m);
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.export_path, ".");
            assert_eq!(entry.condition, "default");
            assert!(entry.condition_chain.is_empty());
        }
        assert_eq!(entries[0].target, "./index.js");
        assert_eq!(entries[1].target, "./t.d.ts");
    }

    #[test]
    fn test_string_exports() {
        let m = manifest(r#"{ "name": "pkg", "exports": "./index.js" }"#);
        let entries = flatten_exports(&m);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].export_path, ".");
        assert_eq!(entries[0].condition, "default");
    }

    #[test]
    fn test_subpath_and_condition_maps() {
        let m = manifest(
            r#"{
  "name": "pkg",
  "exports": {
    ".": { "import": "./esm/index.d.ts", "require": "./cjs/index.d.ts" },
    "./sub": "./esm/sub.d.ts"
  }
}"#,
        );
        let entries = flatten_exports(&m);
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].export_path, ".");
        assert_eq!(entries[0].condition, "import");
        assert_eq!(entries[1].export_path, ".");
        assert_eq!(entries[1].condition, "require");
        assert_eq!(entries[2].export_path, "./sub");
        assert_eq!(entries[2].condition, "default");
    }

    #[test]
    fn test_nested_types_condition() {
        let m = manifest(
            r#"{
  "name": "pkg",
  "exports": {
    ".": {
      "import": { "types": "./esm/index.d.ts", "default": "./esm/index.js" },
      "require": { "types": "./cjs/index.d.ts" }
    }
  }
}"#,
        );
        let entries = flatten_exports(&m);
        // import+types canonicalizes to import; import+default to default.
        assert!(entries
            .iter()
            .any(|e| e.condition == "import" && e.target == "./esm/index.d.ts"));
        assert!(entries
            .iter()
            .any(|e| e.condition == "default" && e.target == "./esm/index.js"));
        assert!(entries
            .iter()
            .any(|e| e.condition == "require" && e.target == "./cjs/index.d.ts"));
        // Most-general condition sorts first.
        assert_eq!(entries[0].condition, "default");
    }

    #[test]
    fn test_depth_cap() {
        let mut exports = String::from("\"./leaf.js\"");
        for i in 0..15 {
            exports = format!("{{ \"cond{i}\": {exports} }}");
        }
        let m = manifest(&format!(
            r#"{{ "name": "pkg", "exports": {exports} }}"#
        ));
        // Deeper than the cap: no entries, no panic.
        assert!(flatten_exports(&m).is_empty());
    }

    #[test]
    fn test_fallback_array_takes_first() {
        let m = manifest(
            r#"{ "name": "pkg", "exports": { ".": ["./modern.js", "./legacy.js"] } }"#,
        );
        let entries = flatten_exports(&m);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "./modern.js");
    }
}
