//! Sable Usage - sample-code usage analysis and coverage.
//!
//! Given an [`sable_core::ApiIndex`] and a directory of sample code, this
//! crate infers which API operations the samples exercise — using only
//! API-derived structural maps, never the compiler's type checker — and
//! turns the result into a coverage summary.

pub mod analyzer;
pub mod coverage;
pub mod maps;

pub use analyzer::analyze_usage;
pub use coverage::build_coverage;
pub use maps::ApiMaps;
