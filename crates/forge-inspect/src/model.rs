//! Structured records produced by the inspection engine.
//!
//! All records are plain values: created fresh per inspection call and owned
//! by whoever aggregates or persists them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Kind of a compiler diagnostic. `fatal error` folds into `Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Warning => write!(f, "warning"),
            DiagnosticKind::Error => write!(f, "error"),
        }
    }
}

/// A single compiler- or linker-emitted warning or error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    /// Warning or error.
    pub kind: DiagnosticKind,

    /// Source file, when the dialect encodes a location.
    pub file: Option<String>,

    /// Line number (1-indexed).
    pub line: Option<u32>,

    /// Column number (1-indexed). MSVC often omits it.
    pub column: Option<u32>,

    /// Human-readable message. Never empty.
    pub message: String,

    /// Compiler-specific category (e.g. "unused-variable" or "C4101").
    pub code: Option<String>,

    /// Continuation lines that followed the diagnostic (source snippet, caret).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Diagnostic {
    /// Create a location-less diagnostic.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: None,
            line: None,
            column: None,
            message: message.into(),
            code: None,
            evidence: None,
        }
    }

    /// Set the source location. Zero line/column values are treated as absent.
    pub fn with_location(mut self, file: impl Into<String>, line: u32, column: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = Some(line).filter(|l| *l >= 1);
        self.column = column.filter(|c| *c >= 1);
        self
    }

    /// Set the diagnostic code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the evidence snippet.
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// Whether this diagnostic points at a source line.
    pub fn is_located(&self) -> bool {
        self.file.is_some() && self.line.is_some()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => write!(f, "{file}:{line}:{col}: ")?,
            (Some(file), Some(line), None) => write!(f, "{file}:{line}: ")?,
            (Some(file), None, _) => write!(f, "{file}: ")?,
            _ => {}
        }
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        Ok(())
    }
}

// ============================================================================
// BUILD TARGETS
// ============================================================================

/// Classification of a produced build artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Executable,
    StaticLibrary,
    SharedLibrary,
}

impl TargetType {
    /// Stable snake_case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Executable => "executable",
            TargetType::StaticLibrary => "static_library",
            TargetType::SharedLibrary => "shared_library",
        }
    }

    /// Classify from a CMake link keyword (`static library`, `executable`, ...).
    pub fn from_link_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "executable" => Some(TargetType::Executable),
            "static library" => Some(TargetType::StaticLibrary),
            "shared library" | "shared module" => Some(TargetType::SharedLibrary),
            _ => None,
        }
    }

    /// Classify from an artifact file extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "exe" => Some(TargetType::Executable),
            "lib" | "a" => Some(TargetType::StaticLibrary),
            "dll" | "so" | "dylib" => Some(TargetType::SharedLibrary),
            _ => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build target reported as completed by the build tool.
///
/// Invariant: when `total_steps` is present, `completion_step <= total_steps`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildTarget {
    /// Target or artifact name (e.g. "myapp", "libutils.a", "core.dll").
    pub name: String,

    /// Executable, static or shared library.
    pub target_type: TargetType,

    /// Ninja step at which the target completed (`10` in `[10/20]`).
    pub completion_step: Option<u32>,

    /// Ninja total step count (`20` in `[10/20]`).
    pub total_steps: Option<u32>,

    /// Make progress percentage (`50` in `[ 50%]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
}

impl BuildTarget {
    /// Create a target with no progress metadata.
    pub fn new(name: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            name: name.into(),
            target_type,
            completion_step: None,
            total_steps: None,
            progress_percent: None,
        }
    }

    /// Attach a Ninja `[step/total]` prefix. Inconsistent pairs are dropped.
    pub fn with_steps(mut self, step: u32, total: u32) -> Self {
        if step <= total {
            self.completion_step = Some(step);
            self.total_steps = Some(total);
        }
        self
    }

    /// Attach a Make percentage prefix, clamped to 100.
    pub fn with_progress_percent(mut self, percent: u8) -> Self {
        self.progress_percent = Some(percent.min(100));
        self
    }
}

// ============================================================================
// AGGREGATES
// ============================================================================

/// Toolchain metadata extracted from a CMake configure run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigureMetadata {
    pub project_name: Option<String>,
    pub cmake_version: Option<String>,
    pub generator: Option<String>,
    pub compiler_c: Option<String>,
    pub compiler_cxx: Option<String>,
    pub build_type: Option<String>,
    pub system_name: Option<String>,
    pub system_processor: Option<String>,

    /// Packages located via `find_package`, in first-mention order. May repeat.
    #[serde(default)]
    pub found_packages: Vec<String>,

    /// Cache variables echoed in the configure output.
    #[serde(default)]
    pub configuration_options: BTreeMap<String, String>,
}

impl ConfigureMetadata {
    /// True when no marker at all was recognised.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Look up an echoed cache variable.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.configuration_options.get(name).map(String::as_str)
    }
}

/// Everything extracted from a single build invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildMetadata {
    pub project_name: Option<String>,

    /// Targets in completion order.
    #[serde(default)]
    pub targets: Vec<BuildTarget>,

    #[serde(default)]
    pub warnings: Vec<Diagnostic>,

    #[serde(default)]
    pub errors: Vec<Diagnostic>,

    pub total_files_compiled: Option<u32>,
    pub parallel_jobs: Option<u32>,
}

impl BuildMetadata {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Find a completed target by exact name.
    pub fn target(&self, name: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.name == name)
    }
}
