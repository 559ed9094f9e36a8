//! Console summaries of inspection results.

use std::fmt::Write;

use forge_inspect::{BuildMetadata, ConfigureMetadata, Diagnostic};

/// Diagnostics listed per kind before eliding the rest.
pub const MAX_LISTED_DIAGNOSTICS: usize = 5;

const UNKNOWN: &str = "(unknown)";

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

fn write_diagnostics(out: &mut String, label: &str, diagnostics: &[Diagnostic]) {
    let _ = writeln!(out, "{label}: {}", diagnostics.len());

    // Unlocated linker/driver diagnostics print without a location prefix.
    for diag in diagnostics.iter().take(MAX_LISTED_DIAGNOSTICS) {
        let _ = writeln!(out, "  {diag}");
    }
    if diagnostics.len() > MAX_LISTED_DIAGNOSTICS {
        let _ = writeln!(
            out,
            "  ... and {} more",
            diagnostics.len() - MAX_LISTED_DIAGNOSTICS
        );
    }
}

pub fn render_build(meta: &BuildMetadata) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Project: {}", or_unknown(&meta.project_name));
    let _ = writeln!(out, "Targets ({}):", meta.targets.len());
    for target in &meta.targets {
        let _ = write!(out, "  [{}] {}", target.target_type, target.name);
        match (target.completion_step, target.total_steps, target.progress_percent) {
            (Some(step), Some(total), _) => {
                let _ = write!(out, " (step {step}/{total})");
            }
            (_, _, Some(pct)) => {
                let _ = write!(out, " ({pct}%)");
            }
            _ => {}
        }
        out.push('\n');
    }

    write_diagnostics(&mut out, "Warnings", &meta.warnings);
    write_diagnostics(&mut out, "Errors", &meta.errors);

    if let Some(files) = meta.total_files_compiled {
        let _ = writeln!(out, "Files compiled: {files}");
    }
    if let Some(jobs) = meta.parallel_jobs {
        let _ = writeln!(out, "Parallel jobs: {jobs}");
    }

    out
}

pub fn render_configure(meta: &ConfigureMetadata) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Project: {}", or_unknown(&meta.project_name));
    let _ = writeln!(out, "CMake: {}", or_unknown(&meta.cmake_version));
    let _ = writeln!(out, "Generator: {}", or_unknown(&meta.generator));
    let _ = writeln!(out, "C compiler: {}", or_unknown(&meta.compiler_c));
    let _ = writeln!(out, "CXX compiler: {}", or_unknown(&meta.compiler_cxx));
    match (&meta.system_name, &meta.system_processor) {
        (Some(name), Some(cpu)) => {
            let _ = writeln!(out, "System: {name} ({cpu})");
        }
        (name, _) => {
            let _ = writeln!(out, "System: {}", or_unknown(name));
        }
    }
    let _ = writeln!(out, "Build type: {}", or_unknown(&meta.build_type));
    let _ = writeln!(
        out,
        "Packages ({}): {}",
        meta.found_packages.len(),
        meta.found_packages.join(", ")
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_inspect::{BuildTarget, DiagnosticKind, TargetType};

    #[test]
    fn test_render_build() {
        let meta = BuildMetadata {
            project_name: Some("Widgets".to_string()),
            targets: vec![
                BuildTarget::new("libcore.a", TargetType::StaticLibrary).with_progress_percent(50),
                BuildTarget::new("app", TargetType::Executable).with_steps(4, 4),
            ],
            warnings: vec![Diagnostic::new(DiagnosticKind::Warning, "unused")
                .with_location("a.c", 3, Some(1))],
            errors: vec![Diagnostic::new(DiagnosticKind::Error, "ld returned 1 exit status")],
            total_files_compiled: Some(2),
            parallel_jobs: None,
        };

        let text = render_build(&meta);
        assert!(text.contains("Project: Widgets"));
        assert!(text.contains("[static_library] libcore.a (50%)"));
        assert!(text.contains("[executable] app (step 4/4)"));
        assert!(text.contains("Warnings: 1\n  a.c:3:1: warning: unused"));
        assert!(text.contains("Errors: 1\n  error: ld returned 1 exit status\n"));
        assert!(text.contains("Files compiled: 2"));
        assert!(!text.contains("Parallel jobs"));
    }

    #[test]
    fn test_render_build_lists_linker_errors() {
        let meta = BuildMetadata {
            errors: vec![Diagnostic::new(DiagnosticKind::Error, "cannot open file 'missing.lib'")
                .with_code("LNK1104")],
            ..Default::default()
        };
        let text = render_build(&meta);
        assert!(text.contains("Errors: 1\n  error: cannot open file 'missing.lib' [LNK1104]\n"));
    }

    #[test]
    fn test_render_build_elides_long_lists() {
        let warnings = (1..=8)
            .map(|i| Diagnostic::new(DiagnosticKind::Warning, "w").with_location("a.c", i, None))
            .collect();
        let meta = BuildMetadata {
            warnings,
            ..Default::default()
        };
        let text = render_build(&meta);
        assert!(text.contains("Warnings: 8"));
        assert!(text.contains("... and 3 more"));
        assert!(text.contains("Project: (unknown)"));
    }

    #[test]
    fn test_render_configure() {
        let meta = ConfigureMetadata {
            cmake_version: Some("3.28.1".to_string()),
            system_name: Some("Linux".to_string()),
            system_processor: Some("x86_64".to_string()),
            found_packages: vec!["ZLIB".to_string(), "Threads".to_string()],
            ..Default::default()
        };
        let text = render_configure(&meta);
        assert!(text.contains("CMake: 3.28.1"));
        assert!(text.contains("Generator: (unknown)"));
        assert!(text.contains("System: Linux (x86_64)"));
        assert!(text.contains("Packages (2): ZLIB, Threads"));
    }
}
