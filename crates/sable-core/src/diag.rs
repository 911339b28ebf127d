//! Structured diagnostics emitted alongside the API graph.

use serde::{Deserialize, Serialize};

/// Short codes for non-fatal extraction warnings. Warnings are grouped and
/// counted per code during graph assembly.
pub mod codes {
    /// A resolved type could not be traversed.
    pub const TYPE_TRAVERSE: &str = "TYPE_TRAVERSE";
    /// A symbol or type name could not be resolved.
    pub const TYPE_RESOLVE: &str = "TYPE_RESOLVE";
    /// A syntactic type annotation could not be walked.
    pub const TYPE_NODE_TRAVERSE: &str = "TYPE_NODE_TRAVERSE";
    /// A dependency declaration could not be extracted.
    pub const DEP_EXTRACT: &str = "DEP_EXTRACT";
    /// A dependency member walk failed.
    pub const DEP_MEMBER_TRAVERSE: &str = "DEP_MEMBER_TRAVERSE";
    /// A dependency type traversal failed.
    pub const DEP_TYPE_TRAVERSE: &str = "DEP_TYPE_TRAVERSE";
    /// A named type was referenced but never located in any package.
    pub const UNRESOLVED_DEPENDENCY: &str = "UNRESOLVED_DEPENDENCY";
    /// A source file failed to parse; it was skipped.
    pub const PARSE_FAILED: &str = "PARSE_FAILED";
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// One structured diagnostic. Stable across reruns on the same inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiDiagnostic {
    /// Short code identifying the diagnostic family.
    pub id: String,

    pub level: DiagnosticLevel,

    /// Human-readable message.
    pub message: String,

    /// Type name the diagnostic is about, when there is one.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl ApiDiagnostic {
    pub fn warning(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level: DiagnosticLevel::Warning,
            message: message.into(),
            type_name: None,
        }
    }

    pub fn info(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level: DiagnosticLevel::Info,
            message: message.into(),
            type_name: None,
        }
    }

    /// Attach the type name this diagnostic refers to.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_serialization() {
        let diag = ApiDiagnostic::warning(codes::TYPE_TRAVERSE, "failed to traverse")
            .with_type("Widget");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains(r#""level":"warning""#));
        assert!(json.contains(r#""type":"Widget""#));

        let back: ApiDiagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(diag, back);
    }

    #[test]
    fn test_level_ordering() {
        assert!(DiagnosticLevel::Info < DiagnosticLevel::Warning);
        assert!(DiagnosticLevel::Warning < DiagnosticLevel::Error);
    }
}
