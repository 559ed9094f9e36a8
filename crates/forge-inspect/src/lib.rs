//! Forge build-output inspection engine.
//!
//! Turns raw CMake configure logs and Ninja/Make/MSBuild build logs (with
//! GCC, Clang or MSVC diagnostics) into structured records: project identity,
//! toolchain metadata, warnings and errors, and completed targets in order.
//!
//! The engine is synchronous and pure. Every extractor owns its compiled
//! patterns; nothing is cached globally, so inspectors can be shared freely
//! across threads.

pub mod configure;
pub mod diagnostics;
pub mod error;
pub mod inspector;
pub mod model;
pub mod normalize;
pub mod project;
pub mod targets;

use regex::Regex;

pub use configure::ConfigureAnalyzer;
pub use diagnostics::{dedup_diagnostics, DiagnosticDialect, DiagnosticExtractor};
pub use error::{InspectError, Result};
pub use inspector::{
    inspect_build_output, inspect_build_output_with, inspect_configure_output, BuildInspector,
    InspectOptions,
};
pub use model::{
    BuildMetadata, BuildTarget, ConfigureMetadata, Diagnostic, DiagnosticKind, TargetType,
};
pub use normalize::{decode_lossy, normalize, strip_ansi};
pub use project::{
    detect_project_name, project_name_from_source, read_project_descriptor, ProjectDetector,
};
pub use targets::{BuildDialect, TargetExtractor};

/// Forge inspection engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compile one of the engine's fixed patterns.
///
/// Patterns are compile-time constants, so a failure here is a programming
/// error caught by the unit tests rather than an input-dependent condition.
pub(crate) fn builtin_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("built-in pattern {pattern:?} is invalid: {e}"))
}
