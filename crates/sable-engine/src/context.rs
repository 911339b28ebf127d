//! Per-run mutable state.
//!
//! One `ExtractionContext` exists per extraction run and is never shared
//! across runs; everything it accumulates is folded into the final graph by
//! the assembler and dropped with the run.

use std::collections::BTreeMap;

use sable_core::diag::ApiDiagnostic;
use sable_core::CancellationToken;

/// One recorded extraction warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    /// Short code (`TYPE_TRAVERSE`, `DEP_EXTRACT`, ...).
    pub code: &'static str,
    pub message: String,
    pub type_name: Option<String>,
}

/// Mutable per-run context: warning buffer, unresolved-dependency log, and
/// the cancellation token threaded through the pipeline.
#[derive(Debug, Default)]
pub struct ExtractionContext {
    pub cancel: CancellationToken,
    warnings: Vec<Warning>,
    /// package -> offending type names, kept sorted for stable diagnostics.
    unresolved: BTreeMap<String, Vec<String>>,
}

impl ExtractionContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }

    /// Record a non-fatal warning. Extraction always continues.
    pub fn warn(&mut self, code: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(code, %message, "extraction warning");
        self.warnings.push(Warning {
            code,
            message,
            type_name: None,
        });
    }

    /// Record a non-fatal warning about a specific type.
    pub fn warn_type(
        &mut self,
        code: &'static str,
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        let type_name = type_name.into();
        tracing::warn!(code, %type_name, %message, "extraction warning");
        self.warnings.push(Warning {
            code,
            message,
            type_name: Some(type_name),
        });
    }

    /// Record a type that could not be resolved from `package`.
    pub fn unresolved(&mut self, package: impl Into<String>, type_name: impl Into<String>) {
        let names = self.unresolved.entry(package.into()).or_default();
        let type_name = type_name.into();
        if !names.contains(&type_name) {
            names.push(type_name);
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn unresolved_by_package(&self) -> &BTreeMap<String, Vec<String>> {
        &self.unresolved
    }

    /// Deduplicated warning summary: one diagnostic per code with an
    /// occurrence count, plus one report per package with unresolved types.
    pub fn summarize(&self) -> Vec<ApiDiagnostic> {
        use sable_core::diag::codes;

        let mut by_code: BTreeMap<&'static str, (usize, &Warning)> = BTreeMap::new();
        for warning in &self.warnings {
            let entry = by_code.entry(warning.code).or_insert((0, warning));
            entry.0 += 1;
        }

        let mut out = Vec::new();
        for (code, (count, first)) in by_code {
            let message = if count == 1 {
                first.message.clone()
            } else {
                format!("{} ({} occurrences)", first.message, count)
            };
            let mut diag = ApiDiagnostic::warning(code, message);
            if count == 1 {
                diag.type_name = first.type_name.clone();
            }
            out.push(diag);
        }

        for (package, types) in &self.unresolved {
            let mut types = types.clone();
            types.sort();
            out.push(ApiDiagnostic::warning(
                codes::UNRESOLVED_DEPENDENCY,
                format!(
                    "could not resolve {} type(s) from \"{}\": {}",
                    types.len(),
                    package,
                    types.join(", ")
                ),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::diag::codes;

    #[test]
    fn test_warning_summary_groups_by_code() {
        let mut ctx = ExtractionContext::default();
        ctx.warn(codes::TYPE_TRAVERSE, "failed on Foo");
        ctx.warn(codes::TYPE_TRAVERSE, "failed on Bar");
        ctx.warn(codes::DEP_EXTRACT, "failed on Baz");

        let diags = ctx.summarize();
        assert_eq!(diags.len(), 2);
        let traverse = diags.iter().find(|d| d.id == codes::TYPE_TRAVERSE).unwrap();
        assert!(traverse.message.contains("2 occurrences"));
    }

    #[test]
    fn test_unresolved_report_is_sorted_and_deduped() {
        let mut ctx = ExtractionContext::default();
        ctx.unresolved("pkg-b", "Zeta");
        ctx.unresolved("pkg-a", "Beta");
        ctx.unresolved("pkg-a", "Alpha");
        ctx.unresolved("pkg-a", "Beta");

        let diags = ctx.summarize();
        assert_eq!(diags.len(), 2);
        assert!(diags[0].message.contains("pkg-a"));
        assert!(diags[0].message.contains("Alpha, Beta"));
        assert!(diags[1].message.contains("pkg-b"));
    }
}
