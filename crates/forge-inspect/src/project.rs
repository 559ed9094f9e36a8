//! Project identity detection from `CMakeLists.txt`.
//!
//! Finds the first `project(...)` invocation and returns its name. Comment
//! stripping is naive: `#` to end of line is removed even inside quotes, and
//! existing callers rely on the names that produces.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::{InspectError, Result};

/// File name looked up when a directory is given instead of a descriptor.
pub const DESCRIPTOR_FILE_NAME: &str = "CMakeLists.txt";

const PROJECT_CALL: &str = r#"(?i)project\s*\(\s*(?:"([^"]+)"|'([^']+)'|([^\s)]+))"#;

/// Extracts the declared project name from descriptor contents.
#[derive(Debug, Clone)]
pub struct ProjectDetector {
    project_call: Regex,
}

impl Default for ProjectDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectDetector {
    pub fn new() -> Self {
        Self {
            project_call: crate::builtin_regex(PROJECT_CALL),
        }
    }

    /// Return the name from the first `project()` call, if any.
    pub fn name_from_source(&self, content: &str) -> Option<String> {
        let cleaned = strip_comments(content);
        let caps = self.project_call.captures(&cleaned)?;
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))?
            .as_str()
            .trim();

        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// Read a descriptor (or `<dir>/CMakeLists.txt`) and detect its project name.
    ///
    /// Missing, unreadable or non-UTF-8 descriptors yield `None`.
    pub fn detect(&self, path: &Path) -> Option<String> {
        match read_project_descriptor(path) {
            Ok(content) => self.name_from_source(&content),
            Err(e) => {
                debug!(event = "project.unreadable", error = %e);
                None
            }
        }
    }
}

/// Remove `#` comments line by line, then rejoin.
fn strip_comments(content: &str) -> String {
    content
        .lines()
        .map(|line| match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve a directory to its `CMakeLists.txt`; files are returned unchanged.
pub fn resolve_descriptor(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DESCRIPTOR_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Strictly read a project descriptor as UTF-8 text.
pub fn read_project_descriptor(path: &Path) -> Result<String> {
    let path = resolve_descriptor(path);

    if !path.exists() {
        return Err(InspectError::DescriptorNotFound(path));
    }
    if !path.is_file() {
        return Err(InspectError::NotAFile(path));
    }

    std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == ErrorKind::InvalidData {
            InspectError::InvalidUtf8(path)
        } else {
            InspectError::Io { path, source }
        }
    })
}

/// Detect the project name declared by a descriptor file or source directory.
pub fn detect_project_name(path: impl AsRef<Path>) -> Option<String> {
    ProjectDetector::new().detect(path.as_ref())
}

/// Detect the project name from descriptor contents already in memory.
pub fn project_name_from_source(content: &str) -> Option<String> {
    ProjectDetector::new().name_from_source(content)
}
