//! Error types for build-output inspection.
//!
//! The inspection entry points never fail; these errors only surface from the
//! strict descriptor reader and are folded into "no project name" everywhere
//! else.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("project descriptor not found: {}", .0.display())]
    DescriptorNotFound(PathBuf),

    #[error("project descriptor is not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("project descriptor is not valid UTF-8: {}", .0.display())]
    InvalidUtf8(PathBuf),

    #[error("failed to read project descriptor {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for inspection operations.
pub type Result<T> = std::result::Result<T, InspectError>;
