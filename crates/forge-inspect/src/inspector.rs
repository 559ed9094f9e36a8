//! Aggregation of every extractor into build and configure results.
//!
//! [`BuildInspector`] owns the compiled pattern tables. Build one and reuse it
//! across calls (and threads); the free functions below build a fresh one per
//! call for convenience.

use std::path::Path;

use tracing::debug;

use crate::configure::ConfigureAnalyzer;
use crate::diagnostics::DiagnosticExtractor;
use crate::model::{BuildMetadata, BuildTarget, ConfigureMetadata, Diagnostic};
use crate::project::ProjectDetector;
use crate::targets::TargetExtractor;

/// Options for a build inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectOptions {
    /// Collapse diagnostics repeated across translation units.
    pub deduplicate: bool,

    /// Job count the caller ran the build with; copied into the result.
    pub parallel_jobs: Option<u32>,
}

impl InspectOptions {
    pub fn deduplicated(mut self) -> Self {
        self.deduplicate = true;
        self
    }

    pub fn with_parallel_jobs(mut self, jobs: u32) -> Self {
        self.parallel_jobs = Some(jobs);
        self
    }
}

/// Converts raw build-tool output into structured metadata.
#[derive(Debug, Default)]
pub struct BuildInspector {
    project: ProjectDetector,
    diagnostics: DiagnosticExtractor,
    targets: TargetExtractor,
    configure: ConfigureAnalyzer,
}

impl BuildInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect build output with default options.
    pub fn inspect_build_output(&self, text: &str, descriptor: Option<&Path>) -> BuildMetadata {
        self.inspect_build_output_with(text, descriptor, &InspectOptions::default())
    }

    /// Inspect build output, optionally naming the project from its descriptor.
    ///
    /// Never fails: an unreadable descriptor only leaves `project_name` unset.
    pub fn inspect_build_output_with(
        &self,
        text: &str,
        descriptor: Option<&Path>,
        options: &InspectOptions,
    ) -> BuildMetadata {
        let project_name = descriptor.and_then(|path| self.project.detect(path));
        let targets = self.targets.extract_targets(text);
        let (warnings, errors) = self.diagnostics.extract_all(text, options.deduplicate);
        let compiled = self.targets.count_compiled_files(text);

        debug!(
            event = "inspect.build",
            project = ?project_name,
            targets = targets.len(),
            warnings = warnings.len(),
            errors = errors.len(),
            compiled,
        );

        BuildMetadata {
            project_name,
            targets,
            warnings,
            errors,
            total_files_compiled: (compiled > 0).then_some(compiled),
            parallel_jobs: options.parallel_jobs,
        }
    }

    pub fn inspect_configure_output(&self, text: &str) -> ConfigureMetadata {
        self.configure.analyze(text)
    }

    pub fn extract_warnings(&self, text: &str, deduplicate: bool) -> Vec<Diagnostic> {
        self.diagnostics.extract_warnings(text, deduplicate)
    }

    pub fn extract_errors(&self, text: &str, deduplicate: bool) -> Vec<Diagnostic> {
        self.diagnostics.extract_errors(text, deduplicate)
    }

    pub fn extract_targets(&self, text: &str) -> Vec<BuildTarget> {
        self.targets.extract_targets(text)
    }

    pub fn detect_project_name(&self, path: &Path) -> Option<String> {
        self.project.detect(path)
    }
}

/// Inspect build output with a throwaway inspector.
pub fn inspect_build_output(text: &str, descriptor: Option<&Path>) -> BuildMetadata {
    BuildInspector::new().inspect_build_output(text, descriptor)
}

/// Inspect build output with options, using a throwaway inspector.
pub fn inspect_build_output_with(
    text: &str,
    descriptor: Option<&Path>,
    options: &InspectOptions,
) -> BuildMetadata {
    BuildInspector::new().inspect_build_output_with(text, descriptor, options)
}

/// Inspect configure output with a throwaway inspector.
pub fn inspect_configure_output(text: &str) -> ConfigureMetadata {
    BuildInspector::new().inspect_configure_output(text)
}
