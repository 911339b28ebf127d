//! Sable Core - the normalized API graph model and shared plumbing.
//!
//! This crate defines everything the other Sable crates exchange:
//!
//! - [`ApiIndex`] and its entity records: the language-independent API graph
//! - [`UsageIndex`] / [`CoverageReport`]: usage-analysis results
//! - [`ApiDiagnostic`]: structured non-fatal findings
//! - Export-condition priorities and canonicalization ([`condition`])
//! - The fatal-error taxonomy ([`Error`]) and [`CancellationToken`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   sable-cli     │  (User interface)
//! └────┬───────┬────┘
//!      │       │
//!      ▼       ▼
//! ┌─────────┐ ┌─────────────┐
//! │ sable-  │ │ sable-usage │  (Graph engine / usage analyzer)
//! │ engine  │ └──────┬──────┘
//! └────┬────┘        │
//!      ▼             ▼
//! ┌─────────────────────┐
//! │     sable-core      │  (This crate - shared model)
//! └─────────────────────┘
//! ```

pub mod cancel;
pub mod condition;
pub mod diag;
pub mod error;
pub mod types;

// Re-export core types for convenience
pub use cancel::CancellationToken;
pub use diag::{ApiDiagnostic, DiagnosticLevel};
pub use error::{Error, Result};
pub use types::{
    ApiIndex, ClassInfo, ConstructorInfo, CoverageReport, CrossLanguageMap, DependencyInfo,
    EnumInfo, ExtractMode, ExtractOptions, FunctionInfo, IndexSignatureInfo, InterfaceInfo,
    MethodInfo, ModuleInfo, OperationRef, ParameterInfo, PropertyInfo, TypeAliasInfo, UsageIndex,
};
