//! JSON run records handed to the persistence layer.
//!
//! Each configure or build invocation produces one [`RunRecord`], written as
//! `<dir>/<run_id>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use forge_inspect::{BuildMetadata, ConfigureMetadata};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::runner::{CommandOutput, CommandSpec};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Configure,
    Build,
}

/// Inspection result attached to a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RunMetadata {
    Configure(ConfigureMetadata),
    Build(BuildMetadata),
}

impl RunMetadata {
    pub fn phase(&self) -> Phase {
        match self {
            RunMetadata::Configure(_) => Phase::Configure,
            RunMetadata::Build(_) => Phase::Build,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub phase: Phase,
    pub command: String,
    pub exit_code: i32,
    pub success: bool,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// SHA-256 (hex) of the combined stdout + stderr the metadata came from.
    pub output_digest: String,

    pub metadata: RunMetadata,
}

/// SHA-256 hex digest of captured output.
pub fn output_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

impl RunRecord {
    pub fn new(spec: &CommandSpec, output: &CommandOutput, metadata: RunMetadata) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: metadata.phase(),
            command: spec.display(),
            exit_code: output.exit_code,
            success: output.success(),
            duration_ms: output.duration_ms,
            started_at: output.started_at,
            finished_at: output.finished_at,
            output_digest: output_digest(&output.combined()),
            metadata,
        }
    }

    /// Write the record to `<dir>/<run_id>.json`, creating `dir` if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create record directory {:?}", dir))?;

        let path = dir.join(format!("{}.json", self.run_id));
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize run record")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write run record {:?}", path))?;

        Ok(path)
    }
}
