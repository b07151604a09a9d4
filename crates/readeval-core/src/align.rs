//! Alignment of corrected reads against the reference.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{EvalError, Result};
use crate::obs;

/// Name of the alignment record file inside the output directory.
pub const ALIGNMENT_FILE: &str = "alignment.sam";

/// Stderr lines kept in an [`EvalError::Alignment`] message.
const STDERR_TAIL_LINES: usize = 5;

/// Aligner backends (minimap2, test fakes, ...).
#[async_trait]
pub trait Aligner: Send + Sync {
    /// Align `reads` against `reference` and write SAM records to
    /// `<output_dir>/alignment.sam`. Returns the path of that file.
    async fn align(
        &self,
        reference: &Path,
        reads: &Path,
        threads: u32,
        output_dir: &Path,
    ) -> Result<PathBuf>;
}

/// minimap2 configured for noisy long reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minimap2 {
    /// Path or name of the minimap2 binary.
    pub binary: PathBuf,

    /// Preset passed to `-x`.
    pub preset: String,
}

impl Default for Minimap2 {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("minimap2"),
            preset: "map-ont".to_string(),
        }
    }
}

impl Minimap2 {
    /// minimap2 at `binary` with the `map-ont` preset.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    /// Arguments after the binary name.
    pub fn args(&self, reference: &Path, reads: &Path, threads: u32) -> Vec<String> {
        vec![
            "-ax".to_string(),
            self.preset.clone(),
            reference.display().to_string(),
            reads.display().to_string(),
            "-t".to_string(),
            threads.to_string(),
        ]
    }
}

#[async_trait]
impl Aligner for Minimap2 {
    async fn align(
        &self,
        reference: &Path,
        reads: &Path,
        threads: u32,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let start = Instant::now();
        let sam_path = output_dir.join(ALIGNMENT_FILE);
        let sam = File::create(&sam_path)?;
        let args = self.args(reference, reads, threads);

        tracing::debug!(binary = %self.binary.display(), args = ?args, "running aligner");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(sam))
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EvalError::Alignment(format!(
                    "failed to spawn {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        let output = child.wait_with_output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let exit = output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
            return Err(EvalError::Alignment(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                exit,
                stderr_tail(&stderr)
            )));
        }

        tracing::debug!(stderr = %stderr_tail(&stderr), "aligner finished");
        obs::emit_alignment_finished(&sam_path, start.elapsed());
        Ok(sam_path)
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[skip..].join(" | ")
}
