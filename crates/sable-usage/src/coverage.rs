//! Coverage summary: covered / uncovered / deprecated-excluded.
//!
//! Deprecated operations the samples never touched are intentionally not
//! generation targets, so they are reported separately and removed from the
//! denominator.

use sable_core::types::{ApiIndex, CoverageReport, OperationRef, UsageIndex};

use crate::maps::ApiMaps;

/// Combine an API surface with a usage index into a coverage report.
pub fn build_coverage(api: &ApiIndex, usage: &UsageIndex) -> CoverageReport {
    let maps = ApiMaps::build(api);

    let covered_operations = usage.covered_operations.clone();

    let mut uncovered_operations: Vec<OperationRef> = Vec::new();
    let mut deprecated_excluded: Vec<OperationRef> = Vec::new();
    for operation in &usage.uncovered_operations {
        let key = (operation.type_name.clone(), operation.operation.clone());
        if maps.deprecated.contains(&key) {
            deprecated_excluded.push(operation.clone());
        } else {
            uncovered_operations.push(operation.clone());
        }
    }
    uncovered_operations.sort();
    deprecated_excluded.sort();

    let covered = covered_operations.len();
    let total = covered + uncovered_operations.len();
    let percentage = if total == 0 {
        0.0
    } else {
        (covered as f64 / total as f64) * 100.0
    };

    CoverageReport {
        total,
        covered,
        percentage,
        covered_operations,
        uncovered_operations,
        deprecated_excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::types::{ClassInfo, MethodInfo, ModuleInfo};

    fn api_with_deprecated() -> ApiIndex {
        ApiIndex {
            package: "pkg".to_string(),
            modules: vec![ModuleInfo {
                name: "index".to_string(),
                classes: Some(vec![ClassInfo {
                    name: "BlobClient".to_string(),
                    entry_point: Some(true),
                    methods: Some(vec![
                        MethodInfo {
                            name: "upload".to_string(),
                            sig: "()".to_string(),
                            ..Default::default()
                        },
                        MethodInfo {
                            name: "download".to_string(),
                            sig: "()".to_string(),
                            ..Default::default()
                        },
                        MethodInfo {
                            name: "legacyUpload".to_string(),
                            sig: "()".to_string(),
                            deprecated: Some(true),
                            ..Default::default()
                        },
                    ]),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_deprecated_never_counts_against_coverage() {
        let api = api_with_deprecated();
        let usage = UsageIndex {
            file_count: 1,
            covered_operations: vec![OperationRef::new("BlobClient", "upload")],
            uncovered_operations: vec![
                OperationRef::new("BlobClient", "download"),
                OperationRef::new("BlobClient", "legacyUpload"),
            ],
            patterns: vec![],
        };

        let report = build_coverage(&api, &usage);
        assert_eq!(report.covered, 1);
        assert_eq!(report.total, 2);
        assert_eq!(report.percentage, 50.0);
        assert_eq!(report.uncovered_operations.len(), 1);
        assert_eq!(report.uncovered_operations[0].operation, "download");
        assert_eq!(report.deprecated_excluded.len(), 1);
        assert_eq!(report.deprecated_excluded[0].operation, "legacyUpload");
    }

    #[test]
    fn test_empty_usage_is_zero_percent() {
        let api = api_with_deprecated();
        let usage = UsageIndex::default();
        let report = build_coverage(&api, &usage);
        assert_eq!(report.covered, 0);
        assert_eq!(report.percentage, 0.0);
    }
}
